use serde::{Deserialize, Serialize};

use super::OrderedIndex;
use crate::domain::{FlowId, ImpactId, LocationId};

/// An elementary flow row of the intervention matrix. The location is only
/// set in regionalized calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexFlow {
    pub flow_id: FlowId,
    pub location_id: Option<LocationId>,
    pub is_input: bool,
}

/// Row index of the intervention matrix B.
#[derive(Debug, Clone)]
pub struct FlowIndex {
    regionalized: bool,
    keys: OrderedIndex<(FlowId, Option<LocationId>)>,
    flows: Vec<IndexFlow>,
}

impl FlowIndex {
    pub fn new(regionalized: bool) -> Self {
        Self { regionalized, keys: OrderedIndex::new(), flows: Vec::new() }
    }

    pub fn is_regionalized(&self) -> bool {
        self.regionalized
    }

    /// Returns the row of the flow, registering it on first use. The input
    /// flag of the first registration wins.
    pub fn register(&mut self, flow_id: FlowId, location_id: Option<LocationId>, is_input: bool) -> usize {
        let location_id = if self.regionalized { location_id } else { None };
        let key = (flow_id, location_id);
        if let Some(row) = self.keys.get(&key) {
            return row;
        }
        self.flows.push(IndexFlow { flow_id, location_id, is_input });
        self.keys.put(key)
    }

    pub fn index_of(&self, flow_id: FlowId, location_id: Option<LocationId>) -> Option<usize> {
        let location_id = if self.regionalized { location_id } else { None };
        self.keys.get(&(flow_id, location_id))
    }

    pub fn flow_at(&self, row: usize) -> Option<&IndexFlow> {
        self.flows.get(row)
    }

    pub fn flows(&self) -> &[IndexFlow] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// Row index of the impact matrix C.
#[derive(Debug, Clone, Default)]
pub struct ImpactIndex {
    impacts: OrderedIndex<ImpactId>,
}

impl ImpactIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(impacts: impl IntoIterator<Item = ImpactId>) -> Self {
        let mut index = Self::empty();
        for id in impacts {
            index.impacts.put(id);
        }
        index
    }

    pub fn index_of(&self, impact_id: ImpactId) -> Option<usize> {
        self.impacts.get(&impact_id)
    }

    pub fn impact_at(&self, row: usize) -> Option<ImpactId> {
        self.impacts.at(row).copied()
    }

    pub fn ids(&self) -> &[ImpactId] {
        self.impacts.keys()
    }

    pub fn len(&self) -> usize {
        self.impacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locations_ignored_without_regionalization() {
        let mut index = FlowIndex::new(false);
        let a = index.register(1, Some(10), true);
        let b = index.register(1, Some(11), true);
        assert_eq!(a, b);
        assert_eq!(index.len(), 1);
        assert_eq!(index.flow_at(0).unwrap().location_id, None);
    }

    #[test]
    fn test_locations_split_rows_when_regionalized() {
        let mut index = FlowIndex::new(true);
        let a = index.register(1, Some(10), false);
        let b = index.register(1, Some(11), false);
        let c = index.register(1, None, false);
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(index.index_of(1, Some(11)), Some(1));
    }

    #[test]
    fn test_impact_index_keeps_order() {
        let index = ImpactIndex::of([5, 3, 5, 9]);
        assert_eq!(index.ids(), &[5, 3, 9]);
        assert_eq!(index.index_of(9), Some(2));
    }
}
