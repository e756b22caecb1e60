use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::SolutionProvider;
use crate::domain::Provider;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionItem<T> {
    pub item: T,
    pub amount: f64,
    /// `amount / total`; 0 when the total is 0.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionSet<T> {
    pub total: f64,
    pub contributions: Vec<ContributionItem<T>>,
}

impl<T> ContributionSet<T> {
    pub fn calculate(items: impl IntoIterator<Item = (T, f64)>, total: f64) -> Self {
        let contributions = items
            .into_iter()
            .map(|(item, amount)| ContributionItem {
                item,
                amount,
                share: if total != 0.0 { amount / total } else { 0.0 },
            })
            .collect();
        Self { total, contributions }
    }

    /// Largest amounts first.
    pub fn sort(&mut self) {
        self.contributions
            .sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(Ordering::Equal));
    }

    /// The first `n` items; sort before to get the top contributors.
    pub fn top(&self, n: usize) -> &[ContributionItem<T>] {
        &self.contributions[..n.min(self.contributions.len())]
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }
}

fn by_provider(
    solution: &dyn SolutionProvider,
    total: f64,
    direct: impl Fn(usize) -> f64,
) -> ContributionSet<Provider> {
    let items = solution
        .tech_index()
        .providers()
        .iter()
        .enumerate()
        .map(|(product, provider)| (*provider, direct(product)));
    ContributionSet::calculate(items, total)
}

/// Single (direct) costs of each provider relative to the total costs.
pub fn process_cost_contributions(solution: &dyn SolutionProvider) -> ContributionSet<Provider> {
    by_provider(solution, solution.total_costs(), |product| solution.direct_costs_of(product))
}

/// Direct amounts of one inventory flow per provider.
pub fn process_flow_contributions(solution: &dyn SolutionProvider, flow: usize) -> ContributionSet<Provider> {
    by_provider(solution, solution.total_flow_value_of(flow), |product| {
        solution.direct_flow_of(flow, product)
    })
}

/// Direct impacts of one indicator per provider.
pub fn process_impact_contributions(
    solution: &dyn SolutionProvider,
    indicator: usize,
) -> ContributionSet<Provider> {
    by_provider(solution, solution.total_impact_value_of(indicator), |product| {
        solution.direct_impact_of(indicator, product)
    })
}
