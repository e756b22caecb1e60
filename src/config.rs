use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{AllocationMethod, ProcessType};
use crate::index::{LinkingConfig, ProviderLinking};
use crate::solver::{SolverBackend, DEFAULT_BLOCK_SIZE};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    #[validate(nested)]
    pub solver: SolverConfig,
    pub calculation: CalculationDefaults,
    #[validate(nested)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Worker threads of the parallel backend; rayon's default when unset.
    #[validate(range(min = 1))]
    pub threads: Option<usize>,
    /// Matrices larger than this are inverted block by block.
    #[validate(range(min = 1))]
    pub block_size: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self { backend: SolverBackend::default(), threads: None, block_size: DEFAULT_BLOCK_SIZE }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationDefaults {
    pub allocation: AllocationMethod,
    pub regionalized: bool,
    pub with_costs: bool,
    pub provider_linking: ProviderLinking,
    pub preferred_type: ProcessType,
}

impl CalculationDefaults {
    pub fn linking(&self) -> LinkingConfig {
        LinkingConfig {
            provider_linking: self.provider_linking,
            preferred_type: self.preferred_type,
            regionalized: self.regionalized,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SimulationConfig {
    #[validate(range(min = 1))]
    pub iterations: usize,
    /// Fixed base seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { iterations: 100, seed: None }
    }
}

impl EngineConfig {
    /// `config/default.toml` overlaid with `LCA__` environment variables,
    /// e.g. `LCA__SOLVER__BLOCK_SIZE=1000`.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment("config/default.toml"))
    }

    pub fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("LCA__").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: EngineConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = EngineConfig::from_figment(Figment::new().merge(Toml::file("does/not/exist.toml"))).unwrap();
        assert_eq!(config.solver.block_size, 2500);
        assert_eq!(config.simulation.iterations, 100);
        assert_eq!(config.calculation.allocation, AllocationMethod::None);
        assert_eq!(config.calculation.provider_linking, ProviderLinking::PreferDefaults);
    }

    #[test]
    fn test_toml_overrides() {
        let toml = r#"
            [solver]
            backend = "dense"
            block_size = 10

            [calculation]
            allocation = "economic"
            regionalized = true
            provider_linking = "only_defaults"

            [simulation]
            iterations = 500
            seed = 42
        "#;
        let config = EngineConfig::from_figment(Figment::new().merge(Toml::string(toml))).unwrap();
        assert_eq!(config.solver.backend, SolverBackend::Dense);
        assert_eq!(config.solver.block_size, 10);
        assert_eq!(config.calculation.allocation, AllocationMethod::Economic);
        assert!(config.calculation.linking().regionalized);
        assert_eq!(config.simulation.seed, Some(42));
    }

    #[test]
    fn test_validation_rejects_zero_block_size() {
        let toml = "[solver]\nblock_size = 0\n";
        assert!(EngineConfig::from_figment(Figment::new().merge(Toml::string(toml))).is_err());
        let toml = "[simulation]\niterations = 0\n";
        assert!(EngineConfig::from_figment(Figment::new().merge(Toml::string(toml))).is_err());
    }
}
