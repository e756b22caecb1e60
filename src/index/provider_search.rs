use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::domain::{CalcExchange, LocationId, ProcessType, Provider, ProviderInfo};
use crate::source::ProviderTable;

/// How the default provider of an exchange is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProviderLinking {
    IgnoreDefaults,
    #[default]
    PreferDefaults,
    OnlyDefaults,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkingConfig {
    #[serde(default)]
    pub provider_linking: ProviderLinking,
    #[serde(default)]
    pub preferred_type: ProcessType,
    /// Prefer providers located where the consumer is.
    #[serde(default)]
    pub regionalized: bool,
}

/// Picks a concrete provider for an exchange that needs one.
pub struct ProviderSearch<'a> {
    table: &'a ProviderTable,
    config: LinkingConfig,
}

impl<'a> ProviderSearch<'a> {
    pub fn new(table: &'a ProviderTable, config: LinkingConfig) -> Self {
        Self { table, config }
    }

    /// Exchanges of the recipient that should be linked to a supplier. The
    /// recipient's own reference flow is never a candidate.
    pub fn link_candidates<'e>(&self, recipient: &Provider, exchanges: &'e [CalcExchange]) -> Vec<&'e CalcExchange> {
        exchanges
            .iter()
            .filter(|e| e.is_link_candidate())
            .filter(|e| !(e.flow_id == recipient.flow_id && e.is_provider_flow()))
            .collect()
    }

    pub fn find(&self, exchange: &CalcExchange) -> Option<Provider> {
        let candidates = self.table.providers_of(exchange.flow_id);
        if candidates.is_empty() {
            return None;
        }

        if self.config.provider_linking != ProviderLinking::IgnoreDefaults {
            if let Some(default) = exchange.default_provider {
                if let Some(info) = candidates.iter().find(|c| c.provider.process_id == default) {
                    return Some(info.provider);
                }
            }
            if self.config.provider_linking == ProviderLinking::OnlyDefaults {
                return None;
            }
        }

        let location = exchange
            .location_id
            .or_else(|| self.table.location_of(exchange.process_id));
        let mut best: Option<(&ProviderInfo, u8)> = None;
        for candidate in candidates {
            let score = self.score(candidate, location);
            // strictly greater keeps the first candidate on ties
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }
        best.map(|(info, _)| info.provider)
    }

    fn score(&self, candidate: &ProviderInfo, location: Option<LocationId>) -> u8 {
        let mut score = 0;
        if self.config.regionalized && location.is_some() && candidate.location_id == location {
            score += 2;
        }
        if candidate.process_type == self.config.preferred_type {
            score += 1;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table() -> ProviderTable {
        let mut a = ProviderInfo::new(Provider::new(1, 100));
        a.location_id = Some(7);
        a.process_type = ProcessType::LciResult;
        let mut b = ProviderInfo::new(Provider::new(2, 100));
        b.location_id = Some(8);
        let mut c = ProviderInfo::new(Provider::new(3, 100));
        c.location_id = Some(8);
        ProviderTable::new(vec![a, b, c])
    }

    #[test]
    fn test_reference_flow_is_not_a_candidate() {
        let table = table();
        let search = ProviderSearch::new(&table, LinkingConfig::default());
        let exchanges = vec![
            CalcExchange::product_output(5, 1, 50, 1.0),
            CalcExchange::product_input(5, 2, 100, 1.0),
            CalcExchange::elementary_output(5, 3, 900, 1.0),
        ];
        let candidates = search.link_candidates(&Provider::new(5, 50), &exchanges);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].exchange_id, 2);
    }

    #[test]
    fn test_no_provider_for_unknown_flow() {
        let table = table();
        let search = ProviderSearch::new(&table, LinkingConfig::default());
        assert_eq!(search.find(&CalcExchange::product_input(5, 2, 999, 1.0)), None);
    }

    #[rstest]
    #[case(ProviderLinking::PreferDefaults, Some(3), Some(Provider::new(3, 100)))]
    #[case(ProviderLinking::OnlyDefaults, Some(3), Some(Provider::new(3, 100)))]
    #[case(ProviderLinking::OnlyDefaults, None, None)]
    #[case(ProviderLinking::IgnoreDefaults, Some(3), Some(Provider::new(2, 100)))]
    fn test_default_provider_linking(
        #[case] linking: ProviderLinking,
        #[case] default: Option<i64>,
        #[case] expected: Option<Provider>,
    ) {
        let table = table();
        let config = LinkingConfig { provider_linking: linking, ..Default::default() };
        let search = ProviderSearch::new(&table, config);
        let mut exchange = CalcExchange::product_input(5, 2, 100, 1.0);
        exchange.default_provider = default;
        assert_eq!(search.find(&exchange), expected);
    }

    #[test]
    fn test_regionalized_prefers_matching_location() {
        let table = table();
        let config = LinkingConfig {
            provider_linking: ProviderLinking::IgnoreDefaults,
            preferred_type: ProcessType::UnitProcess,
            regionalized: true,
        };
        let search = ProviderSearch::new(&table, config);
        let exchange = CalcExchange::product_input(5, 2, 100, 1.0).with_location(7);
        assert_eq!(search.find(&exchange), Some(Provider::new(1, 100)));

        let exchange = CalcExchange::product_input(5, 2, 100, 1.0).with_location(8);
        assert_eq!(search.find(&exchange), Some(Provider::new(2, 100)));
    }
}
