use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::loops::{loop_factor, loop_products};
use super::{column_of, value_at, SolutionProvider};
use crate::error::CalcResult;
use crate::index::{FlowIndex, ImpactIndex, TechIndex};
use crate::matrix::MatrixData;
use crate::solver::{BlockInversion, MatrixSolver};

/// Full in-memory solution: computes A^-1 (block-wise for large systems)
/// and all intensity matrices up front.
#[derive(Debug, Clone)]
pub struct EagerSolution {
    data: MatrixData,
    scaling: DVector<f64>,
    inverse: DMatrix<f64>,
    /// M = B A^-1
    intensities: DMatrix<f64>,
    /// C M
    impact_intensities: Option<DMatrix<f64>>,
    loop_factors: Vec<f64>,
    total_flows: DVector<f64>,
    total_impacts: Option<DVector<f64>>,
    /// k A^-1, stored as a column
    cost_intensities: Option<DVector<f64>>,
    total_costs: f64,
}

impl EagerSolution {
    pub fn solve(data: MatrixData, solver: &dyn MatrixSolver, block_size: usize) -> CalcResult<Self> {
        let a = &data.tech_matrix;
        let scaling = solver.solve_vector(a, &data.demand_vector())?;
        let inverse = BlockInversion::with_block_size(solver, block_size).run(a)?;

        let intensities = &data.enviro_matrix * &inverse;
        let total_flows = &data.enviro_matrix * &scaling;
        let impact_intensities = data.impact_matrix.as_ref().map(|c| c * &intensities);
        let total_impacts = data.impact_matrix.as_ref().map(|c| c * &total_flows);
        let cost_intensities = data.cost_vector.as_ref().map(|k| inverse.tr_mul(k));
        let total_costs = data.cost_vector.as_ref().map_or(0.0, |k| k.dot(&scaling));

        let loop_factors = loop_products(a)
            .into_iter()
            .enumerate()
            .map(|(j, in_loop)| if in_loop { loop_factor(a[(j, j)], inverse[(j, j)]) } else { 1.0 })
            .collect();

        debug!(
            solver = solver.name(),
            products = a.nrows(),
            flows = data.enviro_matrix.nrows(),
            "eager solution ready"
        );

        Ok(Self {
            data,
            scaling,
            inverse,
            intensities,
            impact_intensities,
            loop_factors,
            total_flows,
            total_impacts,
            cost_intensities,
            total_costs,
        })
    }

    pub fn data(&self) -> &MatrixData {
        &self.data
    }

    pub fn inverse(&self) -> &DMatrix<f64> {
        &self.inverse
    }

    /// M = B A^-1
    pub fn intensity_matrix(&self) -> &DMatrix<f64> {
        &self.intensities
    }
}

impl SolutionProvider for EagerSolution {
    fn tech_index(&self) -> &TechIndex {
        &self.data.tech_index
    }

    fn flow_index(&self) -> &FlowIndex {
        &self.data.flow_index
    }

    fn impact_index(&self) -> &ImpactIndex {
        &self.data.impact_index
    }

    fn scaling_vector(&self) -> &[f64] {
        self.scaling.as_slice()
    }

    fn tech_column_of(&self, product: usize) -> Vec<f64> {
        column_of(&self.data.tech_matrix, product)
    }

    fn solution_of_one(&self, product: usize) -> Vec<f64> {
        column_of(&self.inverse, product)
    }

    fn loop_factor_of(&self, product: usize) -> f64 {
        self.loop_factors.get(product).copied().unwrap_or(1.0)
    }

    fn unscaled_flows_of(&self, product: usize) -> Vec<f64> {
        column_of(&self.data.enviro_matrix, product)
    }

    fn total_flows_of_one(&self, product: usize) -> Vec<f64> {
        column_of(&self.intensities, product)
    }

    fn total_flows(&self) -> Vec<f64> {
        self.total_flows.as_slice().to_vec()
    }

    fn impact_factors_of(&self, flow: usize) -> Vec<f64> {
        self.data
            .impact_matrix
            .as_ref()
            .map(|c| column_of(c, flow))
            .unwrap_or_default()
    }

    fn total_impacts_of_one(&self, product: usize) -> Vec<f64> {
        self.impact_intensities
            .as_ref()
            .map(|m| column_of(m, product))
            .unwrap_or_default()
    }

    fn total_impacts(&self) -> Vec<f64> {
        self.total_impacts
            .as_ref()
            .map(|h| h.as_slice().to_vec())
            .unwrap_or_default()
    }

    fn has_costs(&self) -> bool {
        self.data.cost_vector.is_some()
    }

    fn unscaled_costs_of(&self, product: usize) -> f64 {
        self.data
            .cost_vector
            .as_ref()
            .map_or(0.0, |k| value_at(k.as_slice(), product))
    }

    fn total_costs(&self) -> f64 {
        self.total_costs
    }

    fn total_costs_of_one(&self, product: usize) -> f64 {
        self.cost_intensities
            .as_ref()
            .map_or(0.0, |c| value_at(c.as_slice(), product))
    }
}
