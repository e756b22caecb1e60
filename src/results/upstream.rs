use serde::{Deserialize, Serialize};

use super::{value_at, SolutionProvider};
use crate::domain::Provider;

/// The quantity an upstream tree breaks down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpstreamSubject {
    Costs,
    Flow(usize),
    Impact(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamNode {
    /// Slot of the provider in the tech index.
    pub index: usize,
    pub provider: Provider,
    /// Amount of the provider's product required by the parent, in the
    /// direction of the diagonal entry.
    pub required_amount: f64,
    /// `required_amount / A[index][index]`
    pub scaling: f64,
    /// `loop[index] * required_amount * intensity[index]`
    pub result: f64,
}

/// Supply-chain breakdown of one result starting at the reference product.
///
/// Children are not stored. [`UpstreamTree::children_of`] expands a node
/// from the non-zero off-diagonal entries of its column in A, so trees of
/// looped systems can be walked as deep as the caller needs.
pub struct UpstreamTree<'a> {
    solution: &'a dyn SolutionProvider,
    subject: UpstreamSubject,
    root: UpstreamNode,
}

impl<'a> UpstreamTree<'a> {
    pub fn costs(solution: &'a dyn SolutionProvider) -> Self {
        Self::of(solution, UpstreamSubject::Costs)
    }

    pub fn flow(solution: &'a dyn SolutionProvider, flow: usize) -> Self {
        Self::of(solution, UpstreamSubject::Flow(flow))
    }

    pub fn impact(solution: &'a dyn SolutionProvider, indicator: usize) -> Self {
        Self::of(solution, UpstreamSubject::Impact(indicator))
    }

    pub fn of(solution: &'a dyn SolutionProvider, subject: UpstreamSubject) -> Self {
        let reference = solution.tech_index().reference();
        let index = solution.tech_index().index_of(&reference).unwrap_or(0);
        let root = node(solution, subject, index, reference, solution.total_requirements_of(index));
        Self { solution, subject, root }
    }

    pub fn subject(&self) -> UpstreamSubject {
        self.subject
    }

    pub fn root(&self) -> &UpstreamNode {
        &self.root
    }

    /// Direct suppliers of `parent`, in tech index order.
    pub fn children_of(&self, parent: &UpstreamNode) -> Vec<UpstreamNode> {
        let column = self.solution.tech_column_of(parent.index);
        let index = self.solution.tech_index();
        column
            .iter()
            .enumerate()
            .filter(|&(row, &a)| row != parent.index && a != 0.0)
            .filter_map(|(row, &a)| {
                let provider = index.provider_at(row)?;
                Some(node(self.solution, self.subject, row, provider, -a * parent.scaling))
            })
            .collect()
    }
}

fn node(
    solution: &dyn SolutionProvider,
    subject: UpstreamSubject,
    index: usize,
    provider: Provider,
    required_amount: f64,
) -> UpstreamNode {
    let diagonal = value_at(&solution.tech_column_of(index), index);
    let scaling = if diagonal != 0.0 { required_amount / diagonal } else { 0.0 };
    let intensity = match subject {
        UpstreamSubject::Costs => solution.total_costs_of_one(index),
        UpstreamSubject::Flow(flow) => solution.total_flow_of_one(flow, index),
        UpstreamSubject::Impact(indicator) => solution.total_impact_of_one(indicator, index),
    };
    UpstreamNode {
        index,
        provider,
        required_amount,
        scaling,
        result: solution.loop_factor_of(index) * required_amount * intensity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FlowIndex, ImpactIndex, TechIndex};
    use crate::matrix::MatrixData;
    use crate::results::EagerSolution;
    use crate::solver::DenseSolver;
    use nalgebra::DMatrix;

    /// p1 needs 0.5 of p2, p2 needs 0.2 of p1; p2 emits 2 units of flow 0.
    fn looped() -> EagerSolution {
        let mut index = TechIndex::new(Provider::new(1, 10), 1.0);
        index.put(Provider::new(2, 20));
        let mut flows = FlowIndex::new(false);
        flows.register(100, None, false);
        let data = MatrixData {
            tech_index: index,
            flow_index: flows,
            impact_index: ImpactIndex::empty(),
            tech_matrix: DMatrix::from_row_slice(2, 2, &[1.0, -0.2, -0.5, 1.0]),
            enviro_matrix: DMatrix::from_row_slice(1, 2, &[1.0, 2.0]),
            impact_matrix: None,
            cost_vector: None,
        };
        EagerSolution::solve(data, &DenseSolver, 2500).unwrap()
    }

    #[test]
    fn test_root_carries_system_total() {
        let solution = looped();
        let tree = UpstreamTree::flow(&solution, 0);
        assert_eq!(tree.root().provider, Provider::new(1, 10));
        assert!((tree.root().result - solution.total_flow_value_of(0)).abs() < 1e-10);
    }

    #[test]
    fn test_children_expand_through_loops() {
        let solution = looped();
        let tree = UpstreamTree::flow(&solution, 0);
        let children = tree.children_of(tree.root());
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].provider, Provider::new(2, 20));
        let s0 = solution.scaling_factor_of(0);
        assert!((children[0].required_amount - 0.5 * s0).abs() < 1e-12);

        let grandchildren = tree.children_of(&children[0]);
        assert_eq!(grandchildren.len(), 1);
        assert_eq!(grandchildren[0].provider, Provider::new(1, 10));
        assert!((grandchildren[0].required_amount - 0.1 * s0).abs() < 1e-12);
        assert!(grandchildren[0].result < tree.root().result);
    }
}
