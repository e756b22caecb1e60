use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

use super::loops::{loop_factor, loop_products};
use super::{column_of, value_at, SolutionProvider};
use crate::error::CalcResult;
use crate::index::{FlowIndex, ImpactIndex, TechIndex};
use crate::matrix::MatrixData;
use crate::solver::MatrixSolver;

/// Solution without a full inverse. Columns of A^-1 are solved on first use
/// (`A x = e_j`) and memoised.
pub struct LazySolution {
    data: MatrixData,
    solver: Arc<dyn MatrixSolver>,
    scaling: DVector<f64>,
    in_loop: Vec<bool>,
    total_flows: DVector<f64>,
    total_impacts: Option<DVector<f64>>,
    total_costs: f64,
    columns: Mutex<HashMap<usize, Arc<Vec<f64>>>>,
}

impl LazySolution {
    pub fn solve(data: MatrixData, solver: Arc<dyn MatrixSolver>) -> CalcResult<Self> {
        let scaling = solver.solve_vector(&data.tech_matrix, &data.demand_vector())?;
        let total_flows = &data.enviro_matrix * &scaling;
        let total_impacts = data.impact_matrix.as_ref().map(|c| c * &total_flows);
        let total_costs = data.cost_vector.as_ref().map_or(0.0, |k| k.dot(&scaling));
        let in_loop = loop_products(&data.tech_matrix);
        debug!(solver = solver.name(), products = data.tech_matrix.nrows(), "lazy solution ready");
        Ok(Self {
            data,
            solver,
            scaling,
            in_loop,
            total_flows,
            total_impacts,
            total_costs,
            columns: Mutex::new(HashMap::new()),
        })
    }

    pub fn data(&self) -> &MatrixData {
        &self.data
    }

    /// Number of memoised columns of A^-1.
    pub fn solved_columns(&self) -> usize {
        self.columns.lock().len()
    }

    fn column(&self, product: usize) -> Option<Arc<Vec<f64>>> {
        let n = self.data.tech_matrix.nrows();
        if product >= n {
            return None;
        }
        if let Some(column) = self.columns.lock().get(&product) {
            return Some(column.clone());
        }

        let mut unit = DVector::zeros(n);
        unit[product] = 1.0;
        match self.solver.solve_vector(&self.data.tech_matrix, &unit) {
            Ok(x) => {
                let column = Arc::new(x.as_slice().to_vec());
                self.columns.lock().insert(product, column.clone());
                Some(column)
            }
            Err(e) => {
                error!(product, error = %e, "failed to solve unit demand");
                None
            }
        }
    }

    fn vector_of(&self, product: usize) -> Option<DVector<f64>> {
        self.column(product).map(|c| DVector::from_column_slice(&c))
    }

    fn multiply(matrix: &DMatrix<f64>, vector: &DVector<f64>) -> Vec<f64> {
        (matrix * vector).as_slice().to_vec()
    }
}

impl SolutionProvider for LazySolution {
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
        self.column(product).map(|c| c.to_vec()).unwrap_or_default()
    }

    fn loop_factor_of(&self, product: usize) -> f64 {
        if !self.in_loop.get(product).copied().unwrap_or(false) {
            return 1.0;
        }
        match self.column(product) {
            Some(column) => loop_factor(self.data.tech_matrix[(product, product)], column[product]),
            None => 1.0,
        }
    }

    fn unscaled_flows_of(&self, product: usize) -> Vec<f64> {
        column_of(&self.data.enviro_matrix, product)
    }

    fn total_flows_of_one(&self, product: usize) -> Vec<f64> {
        self.vector_of(product)
            .map(|x| Self::multiply(&self.data.enviro_matrix, &x))
            .unwrap_or_default()
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
        let (Some(c), Some(x)) = (self.data.impact_matrix.as_ref(), self.vector_of(product)) else {
            return Vec::new();
        };
        let flows = &self.data.enviro_matrix * &x;
        Self::multiply(c, &flows)
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
        match (self.data.cost_vector.as_ref(), self.vector_of(product)) {
            (Some(k), Some(x)) => k.dot(&x),
            _ => 0.0,
        }
    }
}
