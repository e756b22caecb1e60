use nalgebra::DMatrix;

/// Marks the products that are part of a supply loop, i.e. lie on a cycle
/// of off-diagonal links in A. Self-consumption is already netted into the
/// diagonal and does not count.
///
/// Strongly connected components via two iterative depth-first passes; a
/// product is in a loop when its component has more than one member.
pub fn loop_products(a: &DMatrix<f64>) -> Vec<bool> {
    let n = a.nrows().min(a.ncols());
    let mut successors = vec![Vec::new(); n];
    let mut predecessors = vec![Vec::new(); n];
    for col in 0..n {
        for row in 0..n {
            if row != col && a[(row, col)] != 0.0 {
                // column `col` consumes from provider `row`
                successors[col].push(row);
                predecessors[row].push(col);
            }
        }
    }

    let order = finishing_order(&successors);

    let mut component = vec![usize::MAX; n];
    let mut sizes = Vec::new();
    for &root in order.iter().rev() {
        if component[root] != usize::MAX {
            continue;
        }
        let id = sizes.len();
        let mut size = 0;
        let mut stack = vec![root];
        component[root] = id;
        while let Some(node) = stack.pop() {
            size += 1;
            for &next in &predecessors[node] {
                if component[next] == usize::MAX {
                    component[next] = id;
                    stack.push(next);
                }
            }
        }
        sizes.push(size);
    }

    component.iter().map(|&c| sizes[c] > 1).collect()
}

/// `1 / (A[j][j] * A^-1[j][j])` for a product in a loop. A degenerate
/// product gives 1.
pub fn loop_factor(diagonal: f64, inverse_diagonal: f64) -> f64 {
    let d = diagonal * inverse_diagonal;
    if d == 0.0 || !d.is_finite() {
        1.0
    } else {
        1.0 / d
    }
}

fn finishing_order(successors: &[Vec<usize>]) -> Vec<usize> {
    let n = successors.len();
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![(root, 0usize)];
        while let Some((node, next)) = stack.last_mut() {
            let node = *node;
            if *next < successors[node].len() {
                let child = successors[node][*next];
                *next += 1;
                if !visited[child] {
                    visited[child] = true;
                    stack.push((child, 0));
                }
            } else {
                order.push(node);
                stack.pop();
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_has_no_loops() {
        let a = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, -1.0, 1.0]);
        assert_eq!(loop_products(&a), vec![false, false, false]);
    }

    #[test]
    fn test_loop_between_two_products() {
        // 0 -> 1 -> 2 -> 1
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[
                1.0, 0.0, 0.0, //
                -1.0, 1.0, -0.1, //
                0.0, -0.5, 1.0,
            ],
        );
        assert_eq!(loop_products(&a), vec![false, true, true]);
    }

    #[test]
    fn test_self_loop_is_not_a_loop() {
        let a = DMatrix::from_row_slice(1, 1, &[0.5]);
        assert_eq!(loop_products(&a), vec![false]);
    }
}
