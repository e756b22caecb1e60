//! # Monte Carlo Simulation
//!
//! Repeats the calculation of a product system with sampled values. The
//! topology of the system (indices and cell positions) does not change
//! between iterations, only the cell values do, so the [`MatrixModel`] is
//! assembled once and every iteration samples it into its own buffers.
//!
//! Iterations are seeded with `seed + i`; a run with a fixed seed is
//! reproducible regardless of how iterations are scheduled.

pub mod statistics;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::SimulationConfig;
use crate::error::{CalcError, CalcResult};
use crate::index::{FlowIndex, ImpactIndex};
use crate::matrix::MatrixModel;
use crate::solver::MatrixSolver;

pub use statistics::ResultStatistics;

/// Results of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationIteration {
    pub seed: u64,
    pub total_flows: Vec<f64>,
    pub total_impacts: Vec<f64>,
    pub total_costs: f64,
}

pub struct Simulator {
    model: Arc<MatrixModel>,
    solver: Arc<dyn MatrixSolver>,
}

impl Simulator {
    pub fn new(model: MatrixModel, solver: Arc<dyn MatrixSolver>) -> Self {
        Self { model: Arc::new(model), solver }
    }

    pub fn model(&self) -> &MatrixModel {
        &self.model
    }

    /// Samples the model once and solves it.
    pub fn iteration(&self, seed: u64) -> CalcResult<SimulationIteration> {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = self.model.sample(&mut rng);
        let scaling = self.solver.solve_vector(&data.tech_matrix, &data.demand_vector())?;
        let flows = &data.enviro_matrix * &scaling;
        let total_impacts = data
            .impact_matrix
            .as_ref()
            .map(|c| (c * &flows).as_slice().to_vec())
            .unwrap_or_default();
        let total_costs = data.cost_vector.as_ref().map_or(0.0, |k| k.dot(&scaling));
        Ok(SimulationIteration {
            seed,
            total_flows: flows.as_slice().to_vec(),
            total_impacts,
            total_costs,
        })
    }

    /// Runs all iterations. Failed iterations (e.g. a sampled singular
    /// system) are logged and left out; the run only fails when no
    /// iteration succeeded.
    pub fn run(&self, config: &SimulationConfig) -> CalcResult<SimulationResult> {
        let started = Instant::now();
        let base = config.seed.unwrap_or_else(rand::random);
        let seeds: Vec<u64> = (0..config.iterations as u64).map(|i| base.wrapping_add(i)).collect();
        debug!(iterations = seeds.len(), base_seed = base, "starting simulation");

        #[cfg(feature = "parallel")]
        let outcomes: Vec<CalcResult<SimulationIteration>> = seeds.par_iter().map(|&s| self.iteration(s)).collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<CalcResult<SimulationIteration>> = seeds.iter().map(|&s| self.iteration(s)).collect();

        let mut iterations = Vec::with_capacity(outcomes.len());
        let mut failed = 0usize;
        let mut last_error = None;
        for (seed, outcome) in seeds.iter().zip(outcomes) {
            match outcome {
                Ok(iteration) => iterations.push(iteration),
                Err(e) => {
                    error!(seed, error = %e, "simulation iteration failed");
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if iterations.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                CalcError::Configuration("simulation needs at least one iteration".to_string())
            }));
        }

        info!(
            iterations = iterations.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation finished"
        );
        Ok(SimulationResult {
            flow_index: self.model.flow_index.clone(),
            impact_index: self.model.impact_index.clone(),
            iterations,
            failed,
        })
    }
}

/// All recorded iterations of a run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub flow_index: FlowIndex,
    pub impact_index: ImpactIndex,
    pub iterations: Vec<SimulationIteration>,
    pub failed: usize,
}

impl SimulationResult {
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    /// Values of one inventory flow, in iteration order.
    pub fn flow_values(&self, flow: usize) -> Vec<f64> {
        self.iterations
            .iter()
            .map(|it| it.total_flows.get(flow).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn impact_values(&self, indicator: usize) -> Vec<f64> {
        self.iterations
            .iter()
            .map(|it| it.total_impacts.get(indicator).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn cost_values(&self) -> Vec<f64> {
        self.iterations.iter().map(|it| it.total_costs).collect()
    }

    pub fn flow_statistics(&self, flow: usize) -> Option<ResultStatistics> {
        ResultStatistics::of(self.flow_values(flow))
    }

    pub fn impact_statistics(&self, indicator: usize) -> Option<ResultStatistics> {
        ResultStatistics::of(self.impact_values(indicator))
    }

    pub fn cost_statistics(&self) -> Option<ResultStatistics> {
        ResultStatistics::of(self.cost_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Provider, Uncertainty};
    use crate::formula::FormulaContext;
    use crate::index::TechIndex;
    use crate::matrix::{Cell, CellMatrix};
    use crate::solver::DenseSolver;

    fn model(uncertainty: Option<Uncertainty>) -> MatrixModel {
        let mut tech = CellMatrix::new(1, 1);
        tech.add(0, 0, Cell::literal(1.0));
        let mut enviro = CellMatrix::new(1, 1);
        enviro.add(0, 0, Cell::literal(2.0).with_uncertainty(uncertainty));
        let mut flows = FlowIndex::new(false);
        flows.register(100, None, false);
        MatrixModel {
            tech_index: TechIndex::new(Provider::new(1, 10), 1.0),
            flow_index: flows,
            impact_index: ImpactIndex::empty(),
            tech,
            enviro,
            impacts: None,
            costs: None,
            context: FormulaContext::new(),
        }
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let simulator = Simulator::new(model(Some(Uncertainty::normal(2.0, 0.5))), Arc::new(DenseSolver));
        let config = SimulationConfig { iterations: 20, seed: Some(7) };
        let a = simulator.run(&config).unwrap();
        let b = simulator.run(&config).unwrap();
        assert_eq!(a.flow_values(0), b.flow_values(0));
        assert_eq!(a.len(), 20);
        assert_eq!(a.failed, 0);
    }

    #[test]
    fn test_without_uncertainty_every_iteration_is_equal() {
        let simulator = Simulator::new(model(None), Arc::new(DenseSolver));
        let result = simulator.run(&SimulationConfig { iterations: 5, seed: None }).unwrap();
        assert!(result.flow_values(0).iter().all(|&v| v == 2.0));
        let stats = result.flow_statistics(0).unwrap();
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 2.0);
        assert!(result.cost_statistics().is_some());
        assert!(result.impact_values(0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_singular_iterations_fail_the_run() {
        let mut m = model(None);
        m.tech = CellMatrix::new(1, 1);
        let simulator = Simulator::new(m, Arc::new(DenseSolver));
        let result = simulator.run(&SimulationConfig { iterations: 3, seed: Some(1) });
        assert!(matches!(result, Err(CalcError::SingularSystem(_))));
    }
}
