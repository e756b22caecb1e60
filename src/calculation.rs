use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::{CalculationDefaults, EngineConfig};
use crate::domain::{AllocationMethod, ImpactId, ParameterRedef, ProductSystem, Provider};
use crate::error::CalcResult;
use crate::index::{ImpactIndex, LinkingConfig, TechGraphResolver, TechIndex};
use crate::matrix::{MatrixAssembler, MatrixConfig, MatrixData, MatrixModel};
use crate::results::{EagerSolution, LazySolution, SubResult};
use crate::simulation::Simulator;
use crate::solver::{select_solver, MatrixSolver, DEFAULT_BLOCK_SIZE};
use crate::source::{MatrixCache, MatrixSource};

/// Everything a caller decides about one calculation.
#[derive(Debug, Clone)]
pub struct CalculationSetup {
    pub system: ProductSystem,
    pub allocation: AllocationMethod,
    pub impact_index: ImpactIndex,
    pub regionalized: bool,
    pub with_costs: bool,
    pub with_uncertainties: bool,
    /// Applied after the redefinitions stored with the product system.
    pub redefs: Vec<ParameterRedef>,
    pub linking: LinkingConfig,
    pub sub_results: HashMap<Provider, SubResult>,
}

impl CalculationSetup {
    pub fn new(system: ProductSystem) -> Self {
        Self {
            system,
            allocation: AllocationMethod::None,
            impact_index: ImpactIndex::empty(),
            regionalized: false,
            with_costs: false,
            with_uncertainties: false,
            redefs: Vec::new(),
            linking: LinkingConfig::default(),
            sub_results: HashMap::new(),
        }
    }

    pub fn from_defaults(system: ProductSystem, defaults: &CalculationDefaults) -> Self {
        Self {
            allocation: defaults.allocation,
            regionalized: defaults.regionalized,
            with_costs: defaults.with_costs,
            linking: defaults.linking(),
            ..Self::new(system)
        }
    }

    pub fn with_allocation(mut self, method: AllocationMethod) -> Self {
        self.allocation = method;
        self
    }

    pub fn with_impacts(mut self, impacts: impl IntoIterator<Item = ImpactId>) -> Self {
        self.impact_index = ImpactIndex::of(impacts);
        self
    }

    /// Sets location-aware flows and factors, and location-aware provider
    /// search.
    pub fn with_regionalization(mut self, regionalized: bool) -> Self {
        self.regionalized = regionalized;
        self.linking.regionalized = regionalized;
        self
    }

    pub fn with_costs(mut self, with_costs: bool) -> Self {
        self.with_costs = with_costs;
        self
    }

    pub fn with_uncertainties(mut self, with_uncertainties: bool) -> Self {
        self.with_uncertainties = with_uncertainties;
        self
    }

    pub fn with_redef(mut self, redef: ParameterRedef) -> Self {
        self.redefs.push(redef);
        self
    }

    pub fn with_linking(mut self, linking: LinkingConfig) -> Self {
        self.linking = linking;
        self
    }

    pub fn with_sub_result(mut self, provider: Provider, result: SubResult) -> Self {
        self.sub_results.insert(provider, result);
        self
    }

    fn matrix_config(&self) -> MatrixConfig {
        let redefs = self
            .system
            .parameter_redefs
            .iter()
            .chain(&self.redefs)
            .cloned()
            .collect();
        MatrixConfig::new()
            .with_impacts(self.impact_index.clone())
            .with_sub_results(self.sub_results.clone())
            .with_allocation(self.allocation)
            .with_regionalization(self.regionalized)
            .with_costs(self.with_costs)
            .with_uncertainties(self.with_uncertainties)
            .with_redefs(redefs)
    }
}

/// Runs resolution, assembly and solving for product systems. Cheap to
/// clone and safe to share; each calculation owns its own matrices.
#[derive(Clone)]
pub struct SystemCalculator {
    cache: Arc<MatrixCache>,
    solver: Arc<dyn MatrixSolver>,
    block_size: usize,
}

impl SystemCalculator {
    pub fn new(cache: Arc<MatrixCache>, solver: Arc<dyn MatrixSolver>) -> Self {
        Self { cache, solver, block_size: DEFAULT_BLOCK_SIZE }
    }

    /// Selects the solver backend once; an unavailable accelerated backend
    /// falls back to the dense one.
    pub fn from_config(source: Arc<dyn MatrixSource>, config: &EngineConfig) -> Self {
        Self::new(Arc::new(MatrixCache::new(source)), select_solver(&config.solver))
            .with_block_size(config.solver.block_size)
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<MatrixCache> {
        &self.cache
    }

    pub fn solver(&self) -> &Arc<dyn MatrixSolver> {
        &self.solver
    }

    pub async fn build_index(&self, setup: &CalculationSetup) -> CalcResult<TechIndex> {
        TechGraphResolver::new(&self.cache, setup.linking)
            .with_system_links(&setup.system.links)
            .with_sub_systems(setup.sub_results.keys().map(|p| p.process_id))
            .build(setup.system.reference, setup.system.demand)
            .await
    }

    pub async fn assemble(&self, setup: &CalculationSetup) -> CalcResult<MatrixData> {
        let index = self.build_index(setup).await?;
        MatrixAssembler::new(&self.cache)
            .assemble(&index, &setup.matrix_config())
            .await
    }

    pub async fn assemble_model(&self, setup: &CalculationSetup) -> CalcResult<MatrixModel> {
        let index = self.build_index(setup).await?;
        MatrixAssembler::new(&self.cache)
            .assemble_model(&index, &setup.matrix_config())
            .await
    }

    /// Full calculation with an in-memory inverse. The solve runs on the
    /// blocking pool.
    pub async fn calculate(&self, setup: &CalculationSetup) -> CalcResult<EagerSolution> {
        let started = Instant::now();
        let data = self.assemble(setup).await?;
        let products = data.tech_index.size();
        debug!(system = setup.system.id, products, flows = data.flow_index.len(), "matrices assembled");

        let solver = self.solver.clone();
        let block_size = self.block_size;
        let solution =
            tokio::task::spawn_blocking(move || EagerSolution::solve(data, solver.as_ref(), block_size)).await??;

        info!(
            system = setup.system.id,
            products,
            solver = self.solver.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "calculation finished"
        );
        Ok(solution)
    }

    /// Calculation that solves unit demands only when they are asked for.
    pub async fn calculate_lazy(&self, setup: &CalculationSetup) -> CalcResult<LazySolution> {
        let started = Instant::now();
        let data = self.assemble(setup).await?;
        let products = data.tech_index.size();
        let solver = self.solver.clone();
        let solution = tokio::task::spawn_blocking(move || LazySolution::solve(data, solver)).await??;
        info!(
            system = setup.system.id,
            products,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lazy calculation finished"
        );
        Ok(solution)
    }

    /// A Monte Carlo simulator over the cell model of the system.
    pub async fn simulator(&self, setup: &CalculationSetup) -> CalcResult<Simulator> {
        let model = self.assemble_model(setup).await?;
        Ok(Simulator::new(model, self.solver.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CalcExchange;
    use crate::results::SolutionProvider;
    use crate::solver::DenseSolver;
    use crate::source::InMemorySource;

    fn calculator(source: InMemorySource) -> SystemCalculator {
        SystemCalculator::new(Arc::new(MatrixCache::new(Arc::new(source))), Arc::new(DenseSolver))
    }

    fn chain() -> InMemorySource {
        let mut source = InMemorySource::new();
        source.add_process(
            1,
            vec![
                CalcExchange::product_output(1, 1, 10, 1.0),
                CalcExchange::product_input(1, 2, 20, 2.0),
                CalcExchange::elementary_output(1, 3, 100, 1.0),
            ],
        );
        source.add_process(
            2,
            vec![
                CalcExchange::product_output(2, 4, 20, 1.0),
                CalcExchange::elementary_output(2, 5, 100, 3.0),
            ],
        );
        source
    }

    #[tokio::test]
    async fn test_eager_and_lazy_agree() {
        let calculator = calculator(chain());
        let setup = CalculationSetup::new(ProductSystem::new(1, Provider::new(1, 10), 2.0));

        let eager = calculator.calculate(&setup).await.unwrap();
        let lazy = calculator.calculate_lazy(&setup).await.unwrap();

        assert_eq!(eager.scaling_vector(), &[2.0, 4.0]);
        assert_eq!(eager.total_flow_value_of(0), 14.0);
        assert_eq!(lazy.total_flow_value_of(0), 14.0);
        assert!((eager.total_flow_of(0, 1) - lazy.total_flow_of(0, 1)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_setup_redefs_override_system_redefs() {
        let mut source = InMemorySource::new();
        source.add_process(
            1,
            vec![
                CalcExchange::product_output(1, 1, 10, 1.0),
                CalcExchange::elementary_output(1, 2, 100, 1.0).with_formula("x"),
            ],
        );
        source.add_parameter(crate::domain::Parameter::global("x", 1.0));
        let mut system = ProductSystem::new(1, Provider::new(1, 10), 1.0);
        system.parameter_redefs.push(ParameterRedef::new("x", None, 2.0));

        let calculator = calculator(source);
        let setup = CalculationSetup::new(system.clone());
        assert_eq!(calculator.calculate(&setup).await.unwrap().total_flow_value_of(0), 2.0);

        let setup = CalculationSetup::new(system).with_redef(ParameterRedef::new("x", None, 5.0));
        assert_eq!(calculator.calculate(&setup).await.unwrap().total_flow_value_of(0), 5.0);
    }

    #[test]
    fn test_setup_from_defaults() {
        let defaults = CalculationDefaults {
            allocation: AllocationMethod::Physical,
            regionalized: true,
            with_costs: true,
            ..Default::default()
        };
        let setup = CalculationSetup::from_defaults(ProductSystem::new(1, Provider::new(1, 10), 1.0), &defaults);
        assert_eq!(setup.allocation, AllocationMethod::Physical);
        assert!(setup.linking.regionalized);
        assert!(setup.with_costs);
        assert!(!setup.with_uncertainties);
    }
}
