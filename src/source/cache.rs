use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use super::MatrixSource;
use crate::domain::{CalcExchange, FlowId, LocationId, ProcessId, ProviderInfo};

/// Index of all providers by the flow they supply.
#[derive(Debug, Default)]
pub struct ProviderTable {
    rows: Vec<ProviderInfo>,
    by_flow: HashMap<FlowId, Vec<usize>>,
    locations: HashMap<ProcessId, LocationId>,
}

impl ProviderTable {
    pub fn new(rows: Vec<ProviderInfo>) -> Self {
        let mut by_flow: HashMap<FlowId, Vec<usize>> = HashMap::new();
        let mut locations = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            by_flow.entry(row.provider.flow_id).or_default().push(i);
            if let Some(location) = row.location_id {
                locations.insert(row.provider.process_id, location);
            }
        }
        Self { rows, by_flow, locations }
    }

    /// Providers of the flow in table order.
    pub fn providers_of(&self, flow_id: FlowId) -> Vec<&ProviderInfo> {
        self.by_flow
            .get(&flow_id)
            .map(|slots| slots.iter().map(|&i| &self.rows[i]).collect())
            .unwrap_or_default()
    }

    pub fn location_of(&self, process_id: ProcessId) -> Option<LocationId> {
        self.locations.get(&process_id).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read-through cache in front of a [`MatrixSource`].
///
/// Safe to share between concurrent calculations. The lock is never held
/// across a fetch, and a failed fetch stores nothing, so it cannot affect
/// lookups for other keys.
pub struct MatrixCache {
    source: Arc<dyn MatrixSource>,
    exchanges: RwLock<HashMap<ProcessId, Arc<Vec<CalcExchange>>>>,
    provider_table: OnceCell<Arc<ProviderTable>>,
}

impl MatrixCache {
    pub fn new(source: Arc<dyn MatrixSource>) -> Self {
        Self {
            source,
            exchanges: RwLock::new(HashMap::new()),
            provider_table: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &Arc<dyn MatrixSource> {
        &self.source
    }

    pub async fn provider_table(&self) -> Result<Arc<ProviderTable>> {
        let table = self
            .provider_table
            .get_or_try_init(|| async {
                let rows = self.source.providers().await?;
                debug!(providers = rows.len(), "loaded provider table");
                Ok::<_, anyhow::Error>(Arc::new(ProviderTable::new(rows)))
            })
            .await?;
        Ok(table.clone())
    }

    /// Exchanges for the given processes, fetching all misses in one call.
    pub async fn exchanges(
        &self,
        processes: &[ProcessId],
    ) -> Result<HashMap<ProcessId, Arc<Vec<CalcExchange>>>> {
        let mut result = HashMap::with_capacity(processes.len());
        let mut missing = Vec::new();
        {
            let cached = self.exchanges.read();
            for &id in processes {
                if result.contains_key(&id) || missing.contains(&id) {
                    continue;
                }
                match cached.get(&id) {
                    Some(exchanges) => {
                        result.insert(id, exchanges.clone());
                    }
                    None => missing.push(id),
                }
            }
        }

        if missing.is_empty() {
            return Ok(result);
        }

        trace!(hits = result.len(), misses = missing.len(), "fetching exchanges");
        let mut fetched = self.source.exchanges(&missing).await?;
        let mut cached = self.exchanges.write();
        for id in missing {
            let exchanges = Arc::new(fetched.remove(&id).unwrap_or_default());
            cached.insert(id, exchanges.clone());
            result.insert(id, exchanges);
        }
        Ok(result)
    }

    pub fn evict(&self, processes: &[ProcessId]) {
        let mut cached = self.exchanges.write();
        for id in processes {
            cached.remove(id);
        }
    }

    pub fn cached_processes(&self) -> usize {
        self.exchanges.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Provider;
    use crate::source::InMemorySource;

    fn source() -> InMemorySource {
        let mut source = InMemorySource::new();
        source.add_process(
            1,
            vec![
                CalcExchange::product_output(1, 1, 10, 1.0),
                CalcExchange::elementary_input(1, 2, 100, 3.0),
            ],
        );
        source.add_process(2, vec![CalcExchange::product_output(2, 3, 20, 1.0)]);
        source
    }

    #[tokio::test]
    async fn test_exchanges_are_cached() {
        let cache = MatrixCache::new(Arc::new(source()));
        let first = cache.exchanges(&[1, 2, 1]).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[&1].len(), 2);
        assert_eq!(cache.cached_processes(), 2);

        let second = cache.exchanges(&[1]).await.unwrap();
        assert!(Arc::ptr_eq(&first[&1], &second[&1]));
    }

    #[tokio::test]
    async fn test_unknown_process_is_cached_as_empty() {
        let cache = MatrixCache::new(Arc::new(source()));
        let result = cache.exchanges(&[99]).await.unwrap();
        assert!(result[&99].is_empty());
        cache.evict(&[99]);
        assert_eq!(cache.cached_processes(), 0);
    }

    #[tokio::test]
    async fn test_provider_table() {
        let cache = MatrixCache::new(Arc::new(source()));
        let table = cache.provider_table().await.unwrap();
        assert_eq!(table.len(), 2);
        let providers = table.providers_of(20);
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].provider, Provider::new(2, 20));
        assert!(table.providers_of(100).is_empty());
    }
}
