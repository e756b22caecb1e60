use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, warn};

use super::{DenseSolver, MatrixSolver};
use crate::config::SolverConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SolverBackend {
    /// Portable nalgebra backend.
    Dense,
    /// Multi-threaded backend; needs the `parallel` feature.
    #[default]
    Parallel,
}

/// Creates the configured backend. Never fails: an unavailable parallel
/// backend falls back to [`DenseSolver`].
pub fn select_solver(config: &SolverConfig) -> Arc<dyn MatrixSolver> {
    let solver: Arc<dyn MatrixSolver> = match config.backend {
        SolverBackend::Dense => Arc::new(DenseSolver),
        #[cfg(feature = "parallel")]
        SolverBackend::Parallel => match super::ParallelSolver::new(config.threads) {
            Ok(solver) => Arc::new(solver),
            Err(e) => {
                warn!(error = %e, "parallel solver unavailable, falling back to dense");
                Arc::new(DenseSolver)
            }
        },
        #[cfg(not(feature = "parallel"))]
        SolverBackend::Parallel => {
            warn!("parallel solver not compiled in, falling back to dense");
            Arc::new(DenseSolver)
        }
    };
    info!(backend = solver.name(), "solver selected");
    solver
}
