use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::types::{ExchangeId, FlowId, FlowType, ImpactId, LocationId, ProcessId};

/// Declared distribution of an uncertain value.
///
/// Unknown type codes coming from the data source are kept as `Other` and
/// sample as a constant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum DistributionType {
    #[default]
    None,
    LogNormal,
    Normal,
    Triangle,
    Uniform,
    #[strum(default)]
    Other(String),
}

/// Distribution type plus its parameters.
///
/// Parameter meaning per type:
/// - log-normal: geometric mean, geometric standard deviation
/// - normal: mean, standard deviation
/// - triangle: minimum, mode, maximum
/// - uniform: minimum, maximum
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Uncertainty {
    pub distribution: DistributionType,
    pub parameter1: f64,
    pub parameter2: f64,
    pub parameter3: f64,
}

impl Uncertainty {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn normal(mean: f64, sd: f64) -> Self {
        Self { distribution: DistributionType::Normal, parameter1: mean, parameter2: sd, parameter3: 0.0 }
    }

    pub fn log_normal(geo_mean: f64, geo_sd: f64) -> Self {
        Self { distribution: DistributionType::LogNormal, parameter1: geo_mean, parameter2: geo_sd, parameter3: 0.0 }
    }

    pub fn triangle(min: f64, mode: f64, max: f64) -> Self {
        Self { distribution: DistributionType::Triangle, parameter1: min, parameter2: mode, parameter3: max }
    }

    pub fn uniform(min: f64, max: f64) -> Self {
        Self { distribution: DistributionType::Uniform, parameter1: min, parameter2: max, parameter3: 0.0 }
    }

    pub fn is_none(&self) -> bool {
        self.distribution == DistributionType::None
    }
}

/// Raw exchange record of a process as loaded from the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcExchange {
    pub process_id: ProcessId,
    pub exchange_id: ExchangeId,
    pub flow_id: FlowId,
    pub flow_type: FlowType,
    pub is_input: bool,
    pub is_avoided: bool,
    pub amount: f64,
    pub formula: Option<String>,
    /// Converts the exchange unit into the reference unit of the flow.
    pub conversion_factor: f64,
    pub location_id: Option<LocationId>,
    pub default_provider: Option<ProcessId>,
    pub uncertainty: Option<Uncertainty>,
    /// Total cost (or revenue for outputs) of `amount`, not a unit price.
    pub cost_value: Option<f64>,
    pub cost_formula: Option<String>,
    pub currency_factor: f64,
}

impl CalcExchange {
    pub fn new(
        process_id: ProcessId,
        exchange_id: ExchangeId,
        flow_id: FlowId,
        flow_type: FlowType,
        is_input: bool,
        amount: f64,
    ) -> Self {
        Self {
            process_id,
            exchange_id,
            flow_id,
            flow_type,
            is_input,
            is_avoided: false,
            amount,
            formula: None,
            conversion_factor: 1.0,
            location_id: None,
            default_provider: None,
            uncertainty: None,
            cost_value: None,
            cost_formula: None,
            currency_factor: 1.0,
        }
    }

    pub fn product_output(process_id: ProcessId, exchange_id: ExchangeId, flow_id: FlowId, amount: f64) -> Self {
        Self::new(process_id, exchange_id, flow_id, FlowType::Product, false, amount)
    }

    pub fn product_input(process_id: ProcessId, exchange_id: ExchangeId, flow_id: FlowId, amount: f64) -> Self {
        Self::new(process_id, exchange_id, flow_id, FlowType::Product, true, amount)
    }

    pub fn waste_output(process_id: ProcessId, exchange_id: ExchangeId, flow_id: FlowId, amount: f64) -> Self {
        Self::new(process_id, exchange_id, flow_id, FlowType::Waste, false, amount)
    }

    pub fn waste_input(process_id: ProcessId, exchange_id: ExchangeId, flow_id: FlowId, amount: f64) -> Self {
        Self::new(process_id, exchange_id, flow_id, FlowType::Waste, true, amount)
    }

    pub fn elementary_input(process_id: ProcessId, exchange_id: ExchangeId, flow_id: FlowId, amount: f64) -> Self {
        Self::new(process_id, exchange_id, flow_id, FlowType::Elementary, true, amount)
    }

    pub fn elementary_output(process_id: ProcessId, exchange_id: ExchangeId, flow_id: FlowId, amount: f64) -> Self {
        Self::new(process_id, exchange_id, flow_id, FlowType::Elementary, false, amount)
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_cost(mut self, cost_value: f64) -> Self {
        self.cost_value = Some(cost_value);
        self
    }

    pub fn with_cost_formula(mut self, formula: impl Into<String>) -> Self {
        self.cost_formula = Some(formula.into());
        if self.cost_value.is_none() {
            self.cost_value = Some(0.0);
        }
        self
    }

    pub fn with_uncertainty(mut self, uncertainty: Uncertainty) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    pub fn with_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn with_default_provider(mut self, process_id: ProcessId) -> Self {
        self.default_provider = Some(process_id);
        self
    }

    pub fn with_conversion_factor(mut self, factor: f64) -> Self {
        self.conversion_factor = factor;
        self
    }

    /// Avoided products are stored as inputs and avoided wastes as outputs,
    /// so flagging an exchange also moves it to the other side.
    pub fn avoided(mut self) -> Self {
        if !self.is_avoided {
            self.is_avoided = true;
            self.is_input = !self.is_input;
        }
        self
    }

    /// True for the flows a process offers to others: product outputs and
    /// waste inputs (treatment), unless flagged as avoided.
    pub fn is_provider_flow(&self) -> bool {
        if self.is_avoided {
            return false;
        }
        match self.flow_type {
            FlowType::Product => !self.is_input,
            FlowType::Waste => self.is_input,
            FlowType::Elementary => false,
        }
    }

    /// True for exchanges that need a supplier: product inputs, waste
    /// outputs, and avoided products or wastes.
    pub fn is_link_candidate(&self) -> bool {
        self.flow_type != FlowType::Elementary && !self.is_provider_flow()
    }
}

/// Characterization factor of an impact category for one flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcImpactFactor {
    pub impact_id: ImpactId,
    pub flow_id: FlowId,
    pub location_id: Option<LocationId>,
    pub amount: f64,
    pub formula: Option<String>,
    pub conversion_factor: f64,
    pub uncertainty: Option<Uncertainty>,
}

impl CalcImpactFactor {
    pub fn new(impact_id: ImpactId, flow_id: FlowId, amount: f64) -> Self {
        Self {
            impact_id,
            flow_id,
            location_id: None,
            amount,
            formula: None,
            conversion_factor: 1.0,
            uncertainty: None,
        }
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn with_uncertainty(mut self, uncertainty: Uncertainty) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_provider_flows() {
        assert!(CalcExchange::product_output(1, 1, 1, 1.0).is_provider_flow());
        assert!(CalcExchange::waste_input(1, 1, 1, 1.0).is_provider_flow());
        assert!(!CalcExchange::product_input(1, 1, 1, 1.0).is_provider_flow());
        assert!(!CalcExchange::product_output(1, 1, 1, 1.0).avoided().is_provider_flow());
    }

    #[test]
    fn test_avoided_moves_to_other_side_once() {
        let e = CalcExchange::product_output(1, 1, 1, 1.0).avoided().avoided();
        assert!(e.is_input && e.is_avoided);
        let e = CalcExchange::waste_input(1, 1, 1, 1.0).avoided();
        assert!(!e.is_input && e.is_avoided);
    }

    #[test]
    fn test_link_candidates() {
        assert!(CalcExchange::product_input(1, 1, 1, 1.0).is_link_candidate());
        assert!(CalcExchange::waste_output(1, 1, 1, 1.0).is_link_candidate());
        assert!(CalcExchange::product_output(1, 1, 1, 1.0).avoided().is_link_candidate());
        assert!(!CalcExchange::elementary_input(1, 1, 1, 1.0).is_link_candidate());
        assert!(!CalcExchange::product_output(1, 1, 1, 1.0).is_link_candidate());
    }

    #[test]
    fn test_unknown_distribution_is_kept() {
        let d = DistributionType::from_str("BETA").unwrap();
        assert_eq!(d, DistributionType::Other("BETA".to_string()));
        assert_eq!(DistributionType::from_str("log_normal").unwrap(), DistributionType::LogNormal);
    }
}
