use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub type ProcessId = i64;
pub type FlowId = i64;
pub type ExchangeId = i64;
pub type ImpactId = i64;
pub type LocationId = i64;

/// One specific supply of a product (or treatment of a waste): a process,
/// or a pre-solved sub-system, paired with the flow it provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Provider {
    pub process_id: ProcessId,
    pub flow_id: FlowId,
}

impl Provider {
    pub fn new(process_id: ProcessId, flow_id: FlowId) -> Self {
        Self { process_id, flow_id }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Provider(process={}, flow={})", self.process_id, self.flow_id)
    }
}

/// Identifies an exchange of a consuming process; the key of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkKey {
    pub process_id: ProcessId,
    pub exchange_id: ExchangeId,
}

impl LinkKey {
    pub fn new(process_id: ProcessId, exchange_id: ExchangeId) -> Self {
        Self { process_id, exchange_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FlowType {
    Elementary,
    Product,
    Waste,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AllocationMethod {
    #[default]
    None,
    Physical,
    Economic,
    Causal,
}

impl AllocationMethod {
    pub fn is_active(&self) -> bool {
        !matches!(self, AllocationMethod::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProcessType {
    #[default]
    UnitProcess,
    LciResult,
}

/// Scope of a parameter: the global table is implicit, everything else is
/// local to a process or an impact category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterContext {
    Process(ProcessId),
    Impact(ImpactId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;

    #[test]
    fn test_provider_identity_is_the_pair() {
        let mut set = HashSet::new();
        set.insert(Provider::new(1, 10));
        set.insert(Provider::new(1, 10));
        set.insert(Provider::new(1, 11));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_allocation_method_parsing() {
        assert_eq!(AllocationMethod::from_str("Physical").unwrap(), AllocationMethod::Physical);
        assert_eq!(AllocationMethod::from_str("causal").unwrap(), AllocationMethod::Causal);
        assert!(!AllocationMethod::None.is_active());
        assert_eq!(AllocationMethod::Economic.to_string(), "economic");
    }
}
