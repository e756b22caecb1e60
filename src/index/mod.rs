pub mod flow;
pub mod ordered;
pub mod provider_search;
pub mod resolver;
pub mod tech;

pub use flow::{FlowIndex, ImpactIndex, IndexFlow};
pub use ordered::OrderedIndex;
pub use provider_search::{LinkingConfig, ProviderLinking, ProviderSearch};
pub use resolver::TechGraphResolver;
pub use tech::TechIndex;
