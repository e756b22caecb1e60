use std::collections::HashMap;
use tracing::debug;

use super::{Cell, CellMatrix, CellValue};
use crate::domain::{CalcImpactFactor, FlowId, ImpactId, LocationId, ParameterContext};
use crate::index::{FlowIndex, ImpactIndex};

/// Builds the characterization matrix C over the rows of a flow index.
///
/// In regionalized calculations a factor for (flow, location) wins over the
/// factor of the flow without location. Factors of input flows are negated
/// so that they cancel the negative sign of inputs in B.
pub struct ImpactBuilder<'a> {
    flow_index: &'a FlowIndex,
    impact_index: &'a ImpactIndex,
    with_uncertainties: bool,
}

impl<'a> ImpactBuilder<'a> {
    pub fn new(flow_index: &'a FlowIndex, impact_index: &'a ImpactIndex) -> Self {
        Self { flow_index, impact_index, with_uncertainties: false }
    }

    pub fn with_uncertainties(mut self, with_uncertainties: bool) -> Self {
        self.with_uncertainties = with_uncertainties;
        self
    }

    pub fn build(&self, factors: &HashMap<ImpactId, Vec<CalcImpactFactor>>) -> CellMatrix {
        let regionalized = self.flow_index.is_regionalized();
        let mut matrix = CellMatrix::new(self.impact_index.len(), self.flow_index.len());

        for (row, &impact_id) in self.impact_index.ids().iter().enumerate() {
            let Some(list) = factors.get(&impact_id) else {
                continue;
            };

            let mut by_flow: HashMap<(FlowId, Option<LocationId>), &CalcImpactFactor> = HashMap::new();
            for factor in list {
                let location = if regionalized { factor.location_id } else { None };
                let key = (factor.flow_id, location);
                // without regionalization a factor without location wins
                if !by_flow.contains_key(&key) || factor.location_id.is_none() {
                    by_flow.insert(key, factor);
                }
            }

            for (col, flow) in self.flow_index.flows().iter().enumerate() {
                let factor = by_flow
                    .get(&(flow.flow_id, flow.location_id))
                    .or_else(|| by_flow.get(&(flow.flow_id, None)));
                let Some(factor) = factor else {
                    continue;
                };
                matrix.add(row, col, self.cell(factor, impact_id, flow.is_input));
            }
        }

        debug!(impacts = matrix.rows(), flows = matrix.cols(), factors = matrix.len(), "impact matrix built");
        matrix
    }

    fn cell(&self, factor: &CalcImpactFactor, impact_id: ImpactId, is_input: bool) -> Cell {
        let value = CellValue::of(factor.amount, factor.formula.as_deref());
        let uncertainty = if self.with_uncertainties { factor.uncertainty.clone() } else { None };
        Cell::new(value, Some(ParameterContext::Impact(impact_id)))
            .with_conversion_factor(factor.conversion_factor)
            .negated(is_input)
            .with_uncertainty(uncertainty)
    }
}
