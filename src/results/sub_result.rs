use serde::{Deserialize, Serialize};

use super::SolutionProvider;
use crate::domain::{FlowId, LocationId};

/// Snapshot of a solved system that can be linked into another system as
/// a pre-solved provider. Its column is written literally: the reference
/// amount on the diagonal, the total flows into B and the total costs
/// into the cost vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubResult {
    pub reference_amount: f64,
    pub flows: Vec<SubResultFlow>,
    #[serde(default)]
    pub total_costs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubResultFlow {
    pub flow_id: FlowId,
    pub location_id: Option<LocationId>,
    pub is_input: bool,
    pub amount: f64,
}

impl SubResult {
    pub fn of(solution: &dyn SolutionProvider) -> Self {
        let totals = solution.total_flows();
        let flows = solution
            .flow_index()
            .flows()
            .iter()
            .enumerate()
            .filter_map(|(row, flow)| {
                let amount = totals.get(row).copied().unwrap_or(0.0);
                (amount != 0.0).then_some(SubResultFlow {
                    flow_id: flow.flow_id,
                    location_id: flow.location_id,
                    is_input: flow.is_input,
                    amount,
                })
            })
            .collect();

        Self {
            reference_amount: solution.total_requirements_of(0),
            flows,
            total_costs: solution.total_costs(),
        }
    }
}
