use nalgebra::DMatrix;
use tracing::trace;

use super::{check_square, MatrixSolver};
use crate::error::CalcResult;

pub const DEFAULT_BLOCK_SIZE: usize = 2500;

/// Inverts large matrices by solving `A X = I` for contiguous blocks of
/// identity columns, so only one `n x block` right-hand side is alive at a
/// time next to the result. Matrices up to the block size are inverted
/// directly.
pub struct BlockInversion<'a> {
    solver: &'a dyn MatrixSolver,
    max_block_size: usize,
}

impl<'a> BlockInversion<'a> {
    pub fn new(solver: &'a dyn MatrixSolver) -> Self {
        Self::with_block_size(solver, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(solver: &'a dyn MatrixSolver, max_block_size: usize) -> Self {
        Self { solver, max_block_size: max_block_size.max(1) }
    }

    pub fn run(&self, a: &DMatrix<f64>) -> CalcResult<DMatrix<f64>> {
        let dim = check_square(a)?;
        if dim <= self.max_block_size {
            trace!(dim, "matrix fits into one block, direct inverse");
            return self.solver.invert(a);
        }

        let blocks = dim / self.max_block_size + 1;
        let block_size = (dim / blocks).max(1);
        trace!(dim, block_size, blocks, "block-wise inverse");

        let mut inverse = DMatrix::zeros(dim, dim);
        let mut start = 0;
        while start < dim {
            let width = block_size.min(dim - start);
            let mut block = DMatrix::zeros(dim, width);
            for col in 0..width {
                block[(start + col, col)] = 1.0;
            }
            let part = self.solver.solve(a, &block)?;
            inverse.columns_mut(start, width).copy_from(&part);
            start += width;
        }
        Ok(inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalcError;
    use crate::solver::DenseSolver;
    use proptest::prelude::*;
    use rstest::rstest;

    /// Diagonally dominant, hence invertible.
    fn matrix(n: usize, values: &[f64]) -> DMatrix<f64> {
        let mut a = DMatrix::from_column_slice(n, n, values);
        for i in 0..n {
            a[(i, i)] = n as f64 + 1.0;
        }
        a
    }

    fn max_diff(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
        (a - b).abs().max()
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(7)]
    #[case(100)]
    fn test_block_sizes(#[case] block_size: usize) {
        let n = 7;
        let values: Vec<f64> = (0..n * n).map(|i| ((i * 37 % 11) as f64 - 5.0) / 10.0).collect();
        let a = matrix(n, &values);
        let direct = DenseSolver.invert(&a).unwrap();
        let blocked = BlockInversion::with_block_size(&DenseSolver, block_size).run(&a).unwrap();
        assert!(max_diff(&direct, &blocked) < 1e-8);
    }

    #[test]
    fn test_singular_matrix_fails() {
        let a = DMatrix::zeros(4, 4);
        let result = BlockInversion::with_block_size(&DenseSolver, 2).run(&a);
        assert!(matches!(result, Err(CalcError::SingularSystem(_))));
    }

    proptest! {
        #[test]
        fn prop_matches_direct_inverse(
            (n, values) in (1usize..12).prop_flat_map(|n| (Just(n), prop::collection::vec(-1.0f64..1.0, n * n))),
            block_size in 1usize..15,
        ) {
            let a = matrix(n, &values);
            let direct = DenseSolver.invert(&a).unwrap();
            let blocked = BlockInversion::with_block_size(&DenseSolver, block_size).run(&a).unwrap();
            prop_assert!(max_diff(&direct, &blocked) < 1e-8);
        }
    }
}
