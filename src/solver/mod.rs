//! Linear-algebra backends.
//!
//! The engine only needs two primitives, `solve` and `invert`. Backends are
//! picked once at startup by [`select_solver`] and shared as
//! `Arc<dyn MatrixSolver>`.

pub mod block_inversion;
pub mod dense;
pub mod factory;
#[cfg(feature = "parallel")]
pub mod parallel;

use nalgebra::{DMatrix, DVector};

use crate::error::{CalcError, CalcResult};

pub use block_inversion::{BlockInversion, DEFAULT_BLOCK_SIZE};
pub use dense::DenseSolver;
pub use factory::{select_solver, SolverBackend};
#[cfg(feature = "parallel")]
pub use parallel::ParallelSolver;

pub trait MatrixSolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Solves `A X = B` for all columns of `B`.
    fn solve(&self, a: &DMatrix<f64>, b: &DMatrix<f64>) -> CalcResult<DMatrix<f64>>;

    fn solve_vector(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> CalcResult<DVector<f64>> {
        let rhs = DMatrix::from_column_slice(b.len(), 1, b.as_slice());
        let x = self.solve(a, &rhs)?;
        Ok(x.column(0).into_owned())
    }

    fn invert(&self, a: &DMatrix<f64>) -> CalcResult<DMatrix<f64>> {
        let n = check_square(a)?;
        self.solve(a, &DMatrix::identity(n, n))
    }
}

pub(crate) fn check_square(a: &DMatrix<f64>) -> CalcResult<usize> {
    let (rows, cols) = a.shape();
    if rows != cols {
        return Err(CalcError::DimensionMismatch(format!(
            "technology matrix must be square, got {}x{}",
            rows, cols
        )));
    }
    Ok(rows)
}

pub(crate) fn check_rhs(a: &DMatrix<f64>, b: &DMatrix<f64>) -> CalcResult<usize> {
    let n = check_square(a)?;
    if b.nrows() != n {
        return Err(CalcError::DimensionMismatch(format!(
            "right-hand side has {} rows, expected {}",
            b.nrows(),
            n
        )));
    }
    Ok(n)
}
