use std::collections::HashMap;

use crate::domain::{AllocationMethod, ParameterRedef, Provider};
use crate::index::ImpactIndex;
use crate::results::SubResult;

/// Options of one matrix assembly.
#[derive(Debug, Clone, Default)]
pub struct MatrixConfig {
    pub impact_index: ImpactIndex,
    /// Pre-solved sub-systems; their providers are written as a single
    /// column instead of being expanded.
    pub sub_results: HashMap<Provider, SubResult>,
    pub allocation: AllocationMethod,
    pub regionalized: bool,
    pub with_costs: bool,
    pub with_uncertainties: bool,
    pub redefs: Vec<ParameterRedef>,
}

impl MatrixConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_impacts(mut self, impact_index: ImpactIndex) -> Self {
        self.impact_index = impact_index;
        self
    }

    pub fn with_sub_results(mut self, sub_results: HashMap<Provider, SubResult>) -> Self {
        self.sub_results = sub_results;
        self
    }

    pub fn with_allocation(mut self, method: AllocationMethod) -> Self {
        self.allocation = method;
        self
    }

    pub fn with_regionalization(mut self, regionalized: bool) -> Self {
        self.regionalized = regionalized;
        self
    }

    pub fn with_costs(mut self, with_costs: bool) -> Self {
        self.with_costs = with_costs;
        self
    }

    pub fn with_uncertainties(mut self, with_uncertainties: bool) -> Self {
        self.with_uncertainties = with_uncertainties;
        self
    }

    pub fn with_redefs(mut self, redefs: Vec<ParameterRedef>) -> Self {
        self.redefs = redefs;
        self
    }

    pub fn has_impacts(&self) -> bool {
        !self.impact_index.is_empty()
    }
}
