use std::collections::HashMap;

use super::OrderedIndex;
use crate::domain::{LinkKey, ProcessId, Provider};

/// Maps the providers of a product system to the rows and columns of the
/// technology matrix, and records which provider supplies which exchange.
#[derive(Debug, Clone)]
pub struct TechIndex {
    reference: Provider,
    demand: f64,
    providers: OrderedIndex<Provider>,
    links: HashMap<LinkKey, Provider>,
}

impl TechIndex {
    /// Creates an index with the reference provider at slot 0.
    pub fn new(reference: Provider, demand: f64) -> Self {
        let mut providers = OrderedIndex::new();
        providers.put(reference);
        Self { reference, demand, providers, links: HashMap::new() }
    }

    pub fn reference(&self) -> Provider {
        self.reference
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn set_demand(&mut self, demand: f64) {
        self.demand = demand;
    }

    pub fn put(&mut self, provider: Provider) -> usize {
        self.providers.put(provider)
    }

    /// Records the link and adds the provider to the index.
    pub fn put_link(&mut self, exchange: LinkKey, provider: Provider) -> usize {
        self.links.insert(exchange, provider);
        self.providers.put(provider)
    }

    pub fn index_of(&self, provider: &Provider) -> Option<usize> {
        self.providers.get(provider)
    }

    pub fn provider_at(&self, slot: usize) -> Option<Provider> {
        self.providers.at(slot).copied()
    }

    pub fn contains(&self, provider: &Provider) -> bool {
        self.providers.contains(provider)
    }

    pub fn link_of(&self, exchange: &LinkKey) -> Option<Provider> {
        self.links.get(exchange).copied()
    }

    pub fn is_linked(&self, exchange: &LinkKey) -> bool {
        self.links.contains_key(exchange)
    }

    pub fn links(&self) -> impl Iterator<Item = (&LinkKey, &Provider)> {
        self.links.iter()
    }

    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }

    pub fn size(&self) -> usize {
        self.providers.len()
    }

    pub fn providers(&self) -> &[Provider] {
        self.providers.keys()
    }

    /// Distinct process ids in slot order.
    pub fn process_ids(&self) -> Vec<ProcessId> {
        let mut ids = Vec::with_capacity(self.size());
        for provider in self.providers.keys() {
            if !ids.contains(&provider.process_id) {
                ids.push(provider.process_id);
            }
        }
        ids
    }

    /// All providers of the given process (more than one for multi-output
    /// processes).
    pub fn providers_of(&self, process_id: ProcessId) -> Vec<Provider> {
        self.providers
            .keys()
            .iter()
            .filter(|p| p.process_id == process_id)
            .copied()
            .collect()
    }
}
