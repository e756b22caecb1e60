use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, trace};

use super::{LinkingConfig, ProviderSearch, TechIndex};
use crate::domain::{CalcExchange, LinkKey, ProcessId, ProcessLink, Provider};
use crate::error::CalcResult;
use crate::source::MatrixCache;

/// Resolves the provider graph of a product system into a [`TechIndex`].
///
/// Resolution runs in waves: the exchanges of all providers of a wave are
/// fetched in one batch, each link candidate is resolved to a provider,
/// and providers not seen before form the next wave. Every provider is
/// visited once, so cycles in the graph terminate.
pub struct TechGraphResolver<'a> {
    cache: &'a MatrixCache,
    linking: LinkingConfig,
    system_links: HashMap<LinkKey, Provider>,
    sub_systems: HashSet<ProcessId>,
}

impl<'a> TechGraphResolver<'a> {
    pub fn new(cache: &'a MatrixCache, linking: LinkingConfig) -> Self {
        Self {
            cache,
            linking,
            system_links: HashMap::new(),
            sub_systems: HashSet::new(),
        }
    }

    /// Explicit links of the persisted product system. They take precedence
    /// over automatic provider resolution.
    pub fn with_system_links(mut self, links: &[ProcessLink]) -> Self {
        for link in links {
            self.system_links
                .insert(LinkKey::new(link.process_id, link.exchange_id), link.provider());
        }
        self
    }

    /// Processes that are pre-solved sub-systems; they get a slot but are
    /// not expanded.
    pub fn with_sub_systems(mut self, ids: impl IntoIterator<Item = ProcessId>) -> Self {
        self.sub_systems.extend(ids);
        self
    }

    pub async fn build(&self, reference: Provider, demand: f64) -> CalcResult<TechIndex> {
        let (index, _) = self.resolve(reference, demand).await?;
        Ok(index)
    }

    /// Builds the index and reports the number of waves it took.
    async fn resolve(&self, reference: Provider, demand: f64) -> CalcResult<(TechIndex, usize)> {
        trace!(%reference, "build tech index");
        let table = self.cache.provider_table().await?;
        let search = ProviderSearch::new(&table, self.linking);

        let mut index = TechIndex::new(reference, demand);
        let mut handled: HashSet<Provider> = HashSet::new();
        let mut wave = vec![reference];
        let mut waves = 0usize;

        while !wave.is_empty() {
            waves += 1;
            trace!(wave = waves, providers = wave.len(), "fetch next wave");
            let exchanges = self.fetch_exchanges(&wave).await;
            // links between members of the same wave must not queue them again
            handled.extend(wave.iter().copied());
            let mut next: Vec<Provider> = Vec::new();
            let mut queued: HashSet<Provider> = HashSet::new();

            for recipient in &wave {
                let Some(all) = exchanges.get(&recipient.process_id) else {
                    continue;
                };
                for exchange in search.link_candidates(recipient, all) {
                    let key = LinkKey::new(recipient.process_id, exchange.exchange_id);
                    let provider = match self.system_links.get(&key) {
                        Some(linked) => *linked,
                        None => match search.find(exchange) {
                            Some(found) => found,
                            None => continue,
                        },
                    };
                    index.put_link(key, provider);
                    if !handled.contains(&provider) && queued.insert(provider) {
                        next.push(provider);
                    }
                }
            }
            wave = next;
        }

        debug!(providers = index.size(), waves, "tech index complete");
        Ok((index, waves))
    }

    /// One batched fetch per wave. A failure is logged and the wave is
    /// treated as having no exchanges.
    async fn fetch_exchanges(&self, wave: &[Provider]) -> HashMap<ProcessId, Arc<Vec<CalcExchange>>> {
        let ids: Vec<ProcessId> = wave
            .iter()
            .map(|p| p.process_id)
            .filter(|id| !self.sub_systems.contains(id))
            .unique()
            .collect();
        if ids.is_empty() {
            return HashMap::new();
        }
        match self.cache.exchanges(&ids).await {
            Ok(exchanges) => exchanges,
            Err(e) => {
                error!(error = %e, processes = ids.len(), "failed to load exchanges; wave truncated");
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    fn chain_with_loop() -> InMemorySource {
        // 1 -> needs 20 from 2, 2 -> needs 30 from 3, 3 -> needs 20 from 2
        let mut source = InMemorySource::new();
        source.add_process(
            1,
            vec![
                CalcExchange::product_output(1, 1, 10, 1.0),
                CalcExchange::product_input(1, 2, 20, 1.0),
            ],
        );
        source.add_process(
            2,
            vec![
                CalcExchange::product_output(2, 3, 20, 1.0),
                CalcExchange::product_input(2, 4, 30, 0.5),
            ],
        );
        source.add_process(
            3,
            vec![
                CalcExchange::product_output(3, 5, 30, 1.0),
                CalcExchange::product_input(3, 6, 20, 0.1),
            ],
        );
        source
    }

    #[tokio::test]
    async fn test_cycles_terminate() {
        let cache = MatrixCache::new(Arc::new(chain_with_loop()));
        let index = TechGraphResolver::new(&cache, LinkingConfig::default())
            .build(Provider::new(1, 10), 1.0)
            .await
            .unwrap();
        assert_eq!(index.size(), 3);
        assert_eq!(index.link_of(&LinkKey::new(3, 6)), Some(Provider::new(2, 20)));
    }

    #[tokio::test]
    async fn test_system_links_win_over_search() {
        let mut source = chain_with_loop();
        source.add_process(4, vec![CalcExchange::product_output(4, 7, 20, 1.0)]);
        let cache = MatrixCache::new(Arc::new(source));
        let link = ProcessLink { provider_id: 4, flow_id: 20, process_id: 1, exchange_id: 2 };
        let index = TechGraphResolver::new(&cache, LinkingConfig::default())
            .with_system_links(&[link])
            .build(Provider::new(1, 10), 1.0)
            .await
            .unwrap();
        assert_eq!(index.link_of(&LinkKey::new(1, 2)), Some(Provider::new(4, 20)));
        assert_eq!(index.size(), 2);
    }

    #[tokio::test]
    async fn test_links_within_a_wave_are_not_refetched() {
        // 1 needs 20 from 2 and 30 from 3, 2 also needs 30 from 3
        let mut source = InMemorySource::new();
        source
            .add_process(
                1,
                vec![
                    CalcExchange::product_output(1, 1, 10, 1.0),
                    CalcExchange::product_input(1, 2, 20, 1.0),
                    CalcExchange::product_input(1, 3, 30, 1.0),
                ],
            )
            .add_process(
                2,
                vec![
                    CalcExchange::product_output(2, 4, 20, 1.0),
                    CalcExchange::product_input(2, 5, 30, 1.0),
                ],
            )
            .add_process(3, vec![CalcExchange::product_output(3, 6, 30, 1.0)]);
        let cache = MatrixCache::new(Arc::new(source));

        let (index, waves) = TechGraphResolver::new(&cache, LinkingConfig::default())
            .resolve(Provider::new(1, 10), 1.0)
            .await
            .unwrap();
        assert_eq!(index.size(), 3);
        assert_eq!(index.link_of(&LinkKey::new(2, 5)), Some(Provider::new(3, 30)));
        assert_eq!(waves, 2);
    }
}
