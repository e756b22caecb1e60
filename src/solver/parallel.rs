use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::debug;

use super::{check_rhs, MatrixSolver};
use crate::error::{CalcError, CalcResult};

/// Accelerated backend: factorises A once and solves the right-hand-side
/// columns in parallel on a dedicated rayon pool.
pub struct ParallelSolver {
    pool: ThreadPool,
}

impl ParallelSolver {
    pub fn new(threads: Option<usize>) -> CalcResult<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("lca-solver-{}", i));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| CalcError::Configuration(format!("failed to build solver thread pool: {}", e)))?;
        debug!(threads = pool.current_num_threads(), "solver thread pool ready");
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl MatrixSolver for ParallelSolver {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn solve(&self, a: &DMatrix<f64>, b: &DMatrix<f64>) -> CalcResult<DMatrix<f64>> {
        let n = check_rhs(a, b)?;
        if n == 0 || b.ncols() == 0 {
            return Ok(DMatrix::zeros(n, b.ncols()));
        }
        let lu = a.clone().lu();
        if !lu.is_invertible() {
            return Err(CalcError::SingularSystem(format!("{}x{} technology matrix is not invertible", n, n)));
        }
        let columns: Vec<Option<DVector<f64>>> = self.pool.install(|| {
            (0..b.ncols())
                .into_par_iter()
                .map(|j| lu.solve(&b.column(j).into_owned()))
                .collect()
        });
        let columns = columns
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CalcError::SingularSystem(format!("{}x{} technology matrix is not invertible", n, n)))?;
        Ok(DMatrix::from_columns(&columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::DenseSolver;

    #[test]
    fn test_matches_dense_solver() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, -1.0, 0.0, -1.0, 4.0, -1.0, 0.0, -1.0, 4.0]);
        let solver = ParallelSolver::new(Some(2)).unwrap();
        assert_eq!(solver.threads(), 2);
        let parallel = solver.invert(&a).unwrap();
        let dense = DenseSolver.invert(&a).unwrap();
        assert!((parallel - dense).abs().max() < 1e-12);
    }

    #[test]
    fn test_singular_matrix() {
        let solver = ParallelSolver::new(Some(1)).unwrap();
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(matches!(solver.invert(&a), Err(CalcError::SingularSystem(_))));
    }
}
