use std::collections::HashMap;

use crate::domain::{AllocationFactor, AllocationMethod, CalcExchange, ExchangeId, FlowId, ProcessId, Provider};

/// Allocation factors of multi-output processes for one allocation method.
///
/// Physical and economic factors apply to all exchanges of a process
/// product; causal factors are given per exchange. A missing factor is 1.
#[derive(Debug, Clone, Default)]
pub struct AllocationIndex {
    method: AllocationMethod,
    product_factors: HashMap<(ProcessId, FlowId), f64>,
    exchange_factors: HashMap<(ProcessId, FlowId, ExchangeId), f64>,
}

impl AllocationIndex {
    pub fn new(method: AllocationMethod, factors: &HashMap<ProcessId, Vec<AllocationFactor>>) -> Self {
        let mut index = Self { method, ..Default::default() };
        if !method.is_active() {
            return index;
        }
        for factor in factors.values().flatten().filter(|f| f.method == method) {
            match (method, factor.exchange_id) {
                (AllocationMethod::Causal, Some(exchange_id)) => {
                    index
                        .exchange_factors
                        .insert((factor.process_id, factor.product_id, exchange_id), factor.value);
                }
                (AllocationMethod::Causal, None) => {}
                _ => {
                    index
                        .product_factors
                        .insert((factor.process_id, factor.product_id), factor.value);
                }
            }
        }
        index
    }

    pub fn method(&self) -> AllocationMethod {
        self.method
    }

    pub fn factor(&self, provider: &Provider, exchange: &CalcExchange) -> f64 {
        match self.method {
            AllocationMethod::None => 1.0,
            AllocationMethod::Causal => self
                .exchange_factors
                .get(&(provider.process_id, provider.flow_id, exchange.exchange_id))
                .copied()
                .unwrap_or(1.0),
            _ => self
                .product_factors
                .get(&(provider.process_id, provider.flow_id))
                .copied()
                .unwrap_or(1.0),
        }
    }
}

/// True when the exchanges describe a multi-output process that needs
/// allocation.
pub fn is_multi_output(exchanges: &[CalcExchange]) -> bool {
    exchanges.iter().filter(|e| e.is_provider_flow()).count() > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors() -> HashMap<ProcessId, Vec<AllocationFactor>> {
        let mut map = HashMap::new();
        map.insert(
            1,
            vec![
                AllocationFactor::new(1, 10, AllocationMethod::Physical, 0.7),
                AllocationFactor::new(1, 11, AllocationMethod::Physical, 0.3),
                AllocationFactor::new(1, 10, AllocationMethod::Economic, 0.9),
                AllocationFactor::causal(1, 10, 5, 0.25),
            ],
        );
        map
    }

    #[test]
    fn test_product_factors_follow_method() {
        let exchange = CalcExchange::elementary_output(1, 5, 100, 1.0);
        let physical = AllocationIndex::new(AllocationMethod::Physical, &factors());
        assert_eq!(physical.factor(&Provider::new(1, 10), &exchange), 0.7);
        assert_eq!(physical.factor(&Provider::new(1, 11), &exchange), 0.3);

        let economic = AllocationIndex::new(AllocationMethod::Economic, &factors());
        assert_eq!(economic.factor(&Provider::new(1, 10), &exchange), 0.9);
        assert_eq!(economic.factor(&Provider::new(1, 11), &exchange), 1.0);
    }

    #[test]
    fn test_causal_factors_are_per_exchange() {
        let causal = AllocationIndex::new(AllocationMethod::Causal, &factors());
        let provider = Provider::new(1, 10);
        assert_eq!(causal.factor(&provider, &CalcExchange::elementary_output(1, 5, 100, 1.0)), 0.25);
        assert_eq!(causal.factor(&provider, &CalcExchange::elementary_output(1, 6, 100, 1.0)), 1.0);
    }

    #[test]
    fn test_multi_output_detection() {
        let single = vec![
            CalcExchange::product_output(1, 1, 10, 1.0),
            CalcExchange::product_input(1, 2, 20, 1.0),
        ];
        assert!(!is_multi_output(&single));
        let mut multi = single.clone();
        multi.push(CalcExchange::product_output(1, 3, 11, 1.0));
        assert!(is_multi_output(&multi));
    }
}
