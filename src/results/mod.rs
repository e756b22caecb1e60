//! Result derivation.
//!
//! A [`SolutionProvider`] answers every reportable quantity from the indices,
//! the scaling vector and the raw matrix columns. Implementations only
//! provide the primitives; the derived quantities are default methods so
//! both the eager and the lazy solution share one set of identities.
//!
//! Slots are 0-based: `product` is a column of A, `flow` a row of B and
//! `indicator` a row of C. Empty vectors read as zero.

pub mod contributions;
pub mod eager;
pub mod lazy;
pub mod loops;
pub mod sub_result;
pub mod upstream;

use nalgebra::DMatrix;

use crate::index::{FlowIndex, ImpactIndex, TechIndex};

pub use contributions::{
    process_cost_contributions, process_flow_contributions, process_impact_contributions, ContributionItem,
    ContributionSet,
};
pub use eager::EagerSolution;
pub use lazy::LazySolution;
pub use sub_result::{SubResult, SubResultFlow};
pub use upstream::{UpstreamNode, UpstreamSubject, UpstreamTree};

pub(crate) fn value_at(values: &[f64], i: usize) -> f64 {
    values.get(i).copied().unwrap_or(0.0)
}

/// Column `j` as a vector; empty when out of range.
pub(crate) fn column_of(matrix: &DMatrix<f64>, j: usize) -> Vec<f64> {
    if j >= matrix.ncols() {
        return Vec::new();
    }
    matrix.column(j).iter().copied().collect()
}

pub trait SolutionProvider: Send + Sync {
    fn tech_index(&self) -> &TechIndex;

    fn flow_index(&self) -> &FlowIndex;

    fn impact_index(&self) -> &ImpactIndex;

    /// s with `A s = f`.
    fn scaling_vector(&self) -> &[f64];

    /// Unscaled column `A[:, product]`.
    fn tech_column_of(&self, product: usize) -> Vec<f64>;

    /// `A^-1[:, product]`: the scaling vector for one unit of the product.
    fn solution_of_one(&self, product: usize) -> Vec<f64>;

    /// `1 / (A[j][j] * A^-1[j][j])`, exactly 1 outside of supply loops.
    fn loop_factor_of(&self, product: usize) -> f64;

    /// Unscaled column `B[:, product]`.
    fn unscaled_flows_of(&self, product: usize) -> Vec<f64>;

    /// Column of `M = B A^-1`.
    fn total_flows_of_one(&self, product: usize) -> Vec<f64>;

    /// `g = B s`. Inputs are negative.
    fn total_flows(&self) -> Vec<f64>;

    /// Column `C[:, flow]`.
    fn impact_factors_of(&self, flow: usize) -> Vec<f64>;

    /// Column of `C M`.
    fn total_impacts_of_one(&self, product: usize) -> Vec<f64>;

    /// `h = C g`.
    fn total_impacts(&self) -> Vec<f64>;

    fn has_costs(&self) -> bool;

    /// Unscaled cost entry `k[product]`.
    fn unscaled_costs_of(&self, product: usize) -> f64;

    /// `k s`
    fn total_costs(&self) -> f64;

    /// `(k A^-1)[product]`
    fn total_costs_of_one(&self, product: usize) -> f64;

    fn scaling_factor_of(&self, product: usize) -> f64 {
        value_at(self.scaling_vector(), product)
    }

    fn tech_value_of(&self, row: usize, col: usize) -> f64 {
        value_at(&self.tech_column_of(col), row)
    }

    /// `s[col] * A[row][col]`; on the diagonal these are the total
    /// requirements.
    fn scaled_tech_value_of(&self, row: usize, col: usize) -> f64 {
        if self.scaling_vector().is_empty() {
            return 0.0;
        }
        self.scaling_factor_of(col) * self.tech_value_of(row, col)
    }

    /// `t = diag(A) * s`
    fn total_requirements(&self) -> Vec<f64> {
        (0..self.tech_index().size())
            .map(|i| self.scaled_tech_value_of(i, i))
            .collect()
    }

    fn total_requirements_of(&self, product: usize) -> f64 {
        self.scaled_tech_value_of(product, product)
    }

    /// `loop[j] * t[j]`, the factor that turns a result of one unit into
    /// the total result of the product in the system.
    fn total_factor_of(&self, product: usize) -> f64 {
        self.loop_factor_of(product) * self.total_requirements_of(product)
    }

    fn unscaled_flow_of(&self, flow: usize, product: usize) -> f64 {
        value_at(&self.unscaled_flows_of(product), flow)
    }

    /// Column `product` of `G = B diag(s)`.
    fn direct_flows_of(&self, product: usize) -> Vec<f64> {
        if self.scaling_vector().is_empty() {
            return Vec::new();
        }
        let factor = self.scaling_factor_of(product);
        let mut flows = self.unscaled_flows_of(product);
        flows.iter_mut().for_each(|v| *v *= factor);
        flows
    }

    fn direct_flow_of(&self, flow: usize, product: usize) -> f64 {
        self.scaling_factor_of(product) * self.unscaled_flow_of(flow, product)
    }

    fn total_flow_of_one(&self, flow: usize, product: usize) -> f64 {
        value_at(&self.total_flows_of_one(product), flow)
    }

    /// Direct and upstream flows of the product related to the final
    /// demand.
    fn total_flows_of(&self, product: usize) -> Vec<f64> {
        let factor = self.total_factor_of(product);
        let mut totals = self.total_flows_of_one(product);
        totals.iter_mut().for_each(|v| *v *= factor);
        totals
    }

    fn total_flow_of(&self, flow: usize, product: usize) -> f64 {
        self.total_factor_of(product) * self.total_flow_of_one(flow, product)
    }

    fn total_flow_value_of(&self, flow: usize) -> f64 {
        value_at(&self.total_flows(), flow)
    }

    fn impact_factor_of(&self, indicator: usize, flow: usize) -> f64 {
        value_at(&self.impact_factors_of(flow), indicator)
    }

    /// Impacts of one flow of the inventory: `C[:, flow] * g[flow]`.
    fn flow_impacts_of(&self, flow: usize) -> Vec<f64> {
        let total = self.total_flow_value_of(flow);
        let mut impacts = self.impact_factors_of(flow);
        impacts.iter_mut().for_each(|v| *v *= total);
        impacts
    }

    fn flow_impact_of(&self, indicator: usize, flow: usize) -> f64 {
        self.impact_factor_of(indicator, flow) * self.total_flow_value_of(flow)
    }

    /// `C * G[:, product]`
    fn direct_impacts_of(&self, product: usize) -> Vec<f64> {
        let mut impacts = vec![0.0; self.impact_index().len()];
        for (flow, amount) in self.direct_flows_of(product).into_iter().enumerate() {
            if amount == 0.0 {
                continue;
            }
            for (indicator, factor) in self.impact_factors_of(flow).into_iter().enumerate() {
                if let Some(impact) = impacts.get_mut(indicator) {
                    *impact += factor * amount;
                }
            }
        }
        impacts
    }

    fn direct_impact_of(&self, indicator: usize, product: usize) -> f64 {
        value_at(&self.direct_impacts_of(product), indicator)
    }

    fn total_impact_of_one(&self, indicator: usize, product: usize) -> f64 {
        value_at(&self.total_impacts_of_one(product), indicator)
    }

    fn total_impacts_of(&self, product: usize) -> Vec<f64> {
        let factor = self.total_factor_of(product);
        let mut impacts = self.total_impacts_of_one(product);
        impacts.iter_mut().for_each(|v| *v *= factor);
        impacts
    }

    fn total_impact_of(&self, indicator: usize, product: usize) -> f64 {
        self.total_factor_of(product) * self.total_impact_of_one(indicator, product)
    }

    fn total_impact_value_of(&self, indicator: usize) -> f64 {
        value_at(&self.total_impacts(), indicator)
    }

    /// The single (direct) costs of the product: `s[j] * k[j]`.
    fn direct_costs_of(&self, product: usize) -> f64 {
        self.scaling_factor_of(product) * self.unscaled_costs_of(product)
    }

    /// The upstream costs of the product: `loop[j] * t[j] * (k A^-1)[j]`.
    fn total_costs_of(&self, product: usize) -> f64 {
        self.total_factor_of(product) * self.total_costs_of_one(product)
    }
}
