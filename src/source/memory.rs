use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use super::MatrixSource;
use crate::domain::{
    AllocationFactor, CalcExchange, CalcImpactFactor, ImpactId, LocationId, Parameter,
    ParameterContext, ProcessId, ProcessType, Provider, ProviderInfo,
};

/// A [`MatrixSource`] backed by plain collections.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    providers: Vec<ProviderInfo>,
    exchanges: HashMap<ProcessId, Vec<CalcExchange>>,
    impact_factors: HashMap<ImpactId, Vec<CalcImpactFactor>>,
    parameters: Vec<Parameter>,
    allocation_factors: HashMap<ProcessId, Vec<AllocationFactor>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a process; every provider flow among the exchanges becomes a
    /// row of the provider table.
    pub fn add_process(&mut self, process_id: ProcessId, exchanges: Vec<CalcExchange>) -> &mut Self {
        for exchange in exchanges.iter().filter(|e| e.is_provider_flow()) {
            let provider = Provider::new(process_id, exchange.flow_id);
            if !self.providers.iter().any(|row| row.provider == provider) {
                self.providers.push(ProviderInfo::new(provider));
            }
        }
        self.exchanges.entry(process_id).or_default().extend(exchanges);
        self
    }

    /// Registers a provider that has no exchanges of its own, e.g. a
    /// pre-solved sub-system.
    pub fn add_provider(&mut self, info: ProviderInfo) -> &mut Self {
        self.providers.push(info);
        self
    }

    pub fn set_location(&mut self, process_id: ProcessId, location_id: LocationId) -> &mut Self {
        for row in self.providers.iter_mut().filter(|r| r.provider.process_id == process_id) {
            row.location_id = Some(location_id);
        }
        self
    }

    pub fn set_process_type(&mut self, process_id: ProcessId, process_type: ProcessType) -> &mut Self {
        for row in self.providers.iter_mut().filter(|r| r.provider.process_id == process_id) {
            row.process_type = process_type;
        }
        self
    }

    pub fn add_impact_factor(&mut self, factor: CalcImpactFactor) -> &mut Self {
        self.impact_factors.entry(factor.impact_id).or_default().push(factor);
        self
    }

    pub fn add_parameter(&mut self, parameter: Parameter) -> &mut Self {
        self.parameters.push(parameter);
        self
    }

    pub fn add_allocation_factor(&mut self, factor: AllocationFactor) -> &mut Self {
        self.allocation_factors.entry(factor.process_id).or_default().push(factor);
        self
    }
}

fn select<K, V>(map: &HashMap<K, Vec<V>>, keys: &[K]) -> HashMap<K, Vec<V>>
where
    K: std::hash::Hash + Eq + Copy,
    V: Clone,
{
    keys.iter()
        .filter_map(|k| map.get(k).map(|v| (*k, v.clone())))
        .collect()
}

#[async_trait]
impl MatrixSource for InMemorySource {
    async fn providers(&self) -> Result<Vec<ProviderInfo>> {
        Ok(self.providers.clone())
    }

    async fn exchanges(&self, processes: &[ProcessId]) -> Result<HashMap<ProcessId, Vec<CalcExchange>>> {
        Ok(select(&self.exchanges, processes))
    }

    async fn impact_factors(&self, impacts: &[ImpactId]) -> Result<HashMap<ImpactId, Vec<CalcImpactFactor>>> {
        Ok(select(&self.impact_factors, impacts))
    }

    async fn parameters(&self, contexts: &[ParameterContext]) -> Result<Vec<Parameter>> {
        Ok(self
            .parameters
            .iter()
            .filter(|p| match &p.context {
                None => true,
                Some(context) => contexts.contains(context),
            })
            .cloned()
            .collect())
    }

    async fn allocation_factors(
        &self,
        processes: &[ProcessId],
    ) -> Result<HashMap<ProcessId, Vec<AllocationFactor>>> {
        Ok(select(&self.allocation_factors, processes))
    }
}
