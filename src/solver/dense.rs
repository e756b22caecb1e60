use nalgebra::DMatrix;

use super::{check_rhs, check_square, MatrixSolver};
use crate::error::{CalcError, CalcResult};

/// Portable backend: nalgebra LU decomposition with partial pivoting.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseSolver;

impl MatrixSolver for DenseSolver {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn solve(&self, a: &DMatrix<f64>, b: &DMatrix<f64>) -> CalcResult<DMatrix<f64>> {
        let n = check_rhs(a, b)?;
        if n == 0 {
            return Ok(DMatrix::zeros(0, b.ncols()));
        }
        a.clone()
            .lu()
            .solve(b)
            .ok_or_else(|| CalcError::SingularSystem(format!("{}x{} technology matrix is not invertible", n, n)))
    }

    fn invert(&self, a: &DMatrix<f64>) -> CalcResult<DMatrix<f64>> {
        let n = check_square(a)?;
        if n == 0 {
            return Ok(DMatrix::zeros(0, 0));
        }
        a.clone()
            .try_inverse()
            .ok_or_else(|| CalcError::SingularSystem(format!("{}x{} technology matrix is not invertible", n, n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    #[test]
    fn test_solve_vector() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, -2.0, 1.0]);
        let s = DenseSolver.solve_vector(&a, &DVector::from_vec(vec![1.0, 0.0])).unwrap();
        assert!((s[0] - 1.0).abs() < 1e-12);
        assert!((s[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_invert() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let inverse = DenseSolver.invert(&a).unwrap();
        assert_eq!(inverse[(0, 0)], 0.5);
        assert_eq!(inverse[(1, 1)], 0.25);
    }

    #[test]
    fn test_singular_matrix() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(matches!(DenseSolver.invert(&a), Err(CalcError::SingularSystem(_))));
        let zero = DMatrix::zeros(2, 2);
        let b = DMatrix::identity(2, 2);
        assert!(matches!(DenseSolver.solve(&zero, &b), Err(CalcError::SingularSystem(_))));
    }

    #[test]
    fn test_dimension_checks() {
        let a = DMatrix::zeros(2, 3);
        assert!(matches!(DenseSolver.invert(&a), Err(CalcError::DimensionMismatch(_))));
        let square = DMatrix::identity(2, 2);
        let b = DMatrix::zeros(3, 1);
        assert!(matches!(DenseSolver.solve(&square, &b), Err(CalcError::DimensionMismatch(_))));
    }
}
