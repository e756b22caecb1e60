use serde::{Deserialize, Serialize};

use super::parameter::ParameterRedef;
use super::types::{
    AllocationMethod, ExchangeId, FlowId, LocationId, ProcessId, ProcessType, Provider,
};

/// A persisted, explicit link of a product system: the exchange of the
/// consuming process is supplied by the given provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessLink {
    pub provider_id: ProcessId,
    pub flow_id: FlowId,
    pub process_id: ProcessId,
    pub exchange_id: ExchangeId,
}

impl ProcessLink {
    pub fn provider(&self) -> Provider {
        Provider::new(self.provider_id, self.flow_id)
    }
}

/// Read-only snapshot of a product system definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSystem {
    pub id: i64,
    pub reference: Provider,
    pub demand: f64,
    #[serde(default)]
    pub links: Vec<ProcessLink>,
    #[serde(default)]
    pub parameter_redefs: Vec<ParameterRedef>,
}

impl ProductSystem {
    pub fn new(id: i64, reference: Provider, demand: f64) -> Self {
        Self { id, reference, demand, links: Vec::new(), parameter_redefs: Vec::new() }
    }

    pub fn with_link(mut self, link: ProcessLink) -> Self {
        self.links.push(link);
        self
    }
}

/// One row of the provider table: who can supply which flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub provider: Provider,
    pub process_type: ProcessType,
    pub location_id: Option<LocationId>,
}

impl ProviderInfo {
    pub fn new(provider: Provider) -> Self {
        Self { provider, process_type: ProcessType::UnitProcess, location_id: None }
    }
}

/// Allocation factor of a multi-output process for one of its products.
/// Causal factors additionally name the exchange they apply to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationFactor {
    pub process_id: ProcessId,
    pub product_id: FlowId,
    pub method: AllocationMethod,
    pub value: f64,
    pub exchange_id: Option<ExchangeId>,
}

impl AllocationFactor {
    pub fn new(process_id: ProcessId, product_id: FlowId, method: AllocationMethod, value: f64) -> Self {
        Self { process_id, product_id, method, value, exchange_id: None }
    }

    pub fn causal(process_id: ProcessId, product_id: FlowId, exchange_id: ExchangeId, value: f64) -> Self {
        Self {
            process_id,
            product_id,
            method: AllocationMethod::Causal,
            value,
            exchange_id: Some(exchange_id),
        }
    }
}
