use itertools::Itertools;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::allocation::{is_multi_output, AllocationIndex};
use super::{Cell, CellMatrix, CellValue, ImpactBuilder, MatrixConfig, MatrixData, MatrixModel};
use crate::domain::{CalcExchange, FlowType, LinkKey, ParameterContext, ParameterRedef, ProcessId, Provider};
use crate::error::{CalcError, CalcResult};
use crate::formula::FormulaContext;
use crate::index::{FlowIndex, TechIndex};
use crate::results::SubResult;
use crate::source::{MatrixCache, ProviderTable};

/// Turns a [`TechIndex`] and the raw records behind it into matrices.
pub struct MatrixAssembler<'a> {
    cache: &'a MatrixCache,
}

impl<'a> MatrixAssembler<'a> {
    pub fn new(cache: &'a MatrixCache) -> Self {
        Self { cache }
    }

    pub async fn assemble(&self, index: &TechIndex, config: &MatrixConfig) -> CalcResult<MatrixData> {
        Ok(self.assemble_model(index, config).await?.evaluate())
    }

    /// Loads everything the index refers to and builds the cell model. The
    /// model can then be evaluated once or sampled repeatedly.
    pub async fn assemble_model(&self, index: &TechIndex, config: &MatrixConfig) -> CalcResult<MatrixModel> {
        let source = self.cache.source();
        let process_ids: Vec<ProcessId> = index
            .providers()
            .iter()
            .filter(|p| !config.sub_results.contains_key(*p))
            .map(|p| p.process_id)
            .unique()
            .collect();

        let (exchanges, table, allocation, context) = tokio::try_join!(
            async { self.cache.exchanges(&process_ids).await.map_err(CalcError::from) },
            async { self.cache.provider_table().await.map_err(CalcError::from) },
            self.allocation_index(&process_ids, config),
            self.formula_context(&process_ids, config),
        )?;

        let mut inventory = InventoryBuilder::new(index, config, &allocation, &table);
        inventory.build(&exchanges);
        let InventoryBuilder { flow_index, tech, mut enviro, costs, .. } = inventory;
        enviro.set_rows(flow_index.len());

        let impacts = if config.has_impacts() {
            let factors = source.impact_factors(config.impact_index.ids()).await?;
            let matrix = ImpactBuilder::new(&flow_index, &config.impact_index)
                .with_uncertainties(config.with_uncertainties)
                .build(&factors);
            Some(matrix)
        } else {
            None
        };

        debug!(
            providers = index.size(),
            flows = flow_index.len(),
            impacts = config.impact_index.len(),
            tech_cells = tech.len(),
            enviro_cells = enviro.len(),
            "matrix model assembled"
        );

        Ok(MatrixModel {
            tech_index: index.clone(),
            flow_index,
            impact_index: config.impact_index.clone(),
            tech,
            enviro,
            impacts,
            costs: if config.with_costs { Some(costs) } else { None },
            context,
        })
    }

    async fn allocation_index(&self, process_ids: &[ProcessId], config: &MatrixConfig) -> CalcResult<AllocationIndex> {
        if !config.allocation.is_active() {
            return Ok(AllocationIndex::default());
        }
        let factors = self.cache.source().allocation_factors(process_ids).await?;
        Ok(AllocationIndex::new(config.allocation, &factors))
    }

    async fn formula_context(&self, process_ids: &[ProcessId], config: &MatrixConfig) -> CalcResult<FormulaContext> {
        let contexts: Vec<ParameterContext> = process_ids
            .iter()
            .map(|&id| ParameterContext::Process(id))
            .chain(config.impact_index.ids().iter().map(|&id| ParameterContext::Impact(id)))
            .collect();
        let mut parameters = self.cache.source().parameters(&contexts).await?;
        let mut redefs = config.redefs.clone();
        if !config.with_uncertainties {
            parameters.iter_mut().for_each(|p| p.uncertainty = None);
            redefs.iter_mut().for_each(|r: &mut ParameterRedef| r.uncertainty = None);
        }
        let mut context = FormulaContext::from_parameters(&parameters);
        context.apply_redefs(&redefs);
        trace!(parameters = parameters.len(), redefs = redefs.len(), "formula context ready");
        Ok(context)
    }
}

/// Writes the columns of A, B and the cost vector, one provider at a time.
struct InventoryBuilder<'a> {
    index: &'a TechIndex,
    config: &'a MatrixConfig,
    allocation: &'a AllocationIndex,
    table: &'a ProviderTable,
    flow_index: FlowIndex,
    tech: CellMatrix,
    enviro: CellMatrix,
    costs: CellMatrix,
}

impl<'a> InventoryBuilder<'a> {
    fn new(
        index: &'a TechIndex,
        config: &'a MatrixConfig,
        allocation: &'a AllocationIndex,
        table: &'a ProviderTable,
    ) -> Self {
        let n = index.size();
        Self {
            index,
            config,
            allocation,
            table,
            flow_index: FlowIndex::new(config.regionalized),
            tech: CellMatrix::new(n, n),
            enviro: CellMatrix::new(0, n),
            costs: CellMatrix::new(n, 1),
        }
    }

    fn build(&mut self, exchanges: &HashMap<ProcessId, Arc<Vec<CalcExchange>>>) {
        let (index, config) = (self.index, self.config);
        for (slot, provider) in index.providers().iter().enumerate() {
            if let Some(sub) = config.sub_results.get(provider) {
                self.add_sub_result(slot, sub);
                continue;
            }
            match exchanges.get(&provider.process_id) {
                Some(list) => self.add_column(slot, provider, list),
                None => warn!(%provider, "no exchanges for provider; empty column"),
            }
        }
    }

    fn add_column(&mut self, slot: usize, provider: &Provider, exchanges: &[CalcExchange]) {
        let allocate = self.allocation.method().is_active() && is_multi_output(exchanges);
        let process_location = self.table.location_of(provider.process_id);

        for exchange in exchanges {
            if exchange.is_provider_flow() {
                if exchange.flow_id == provider.flow_id {
                    let cell = self.exchange_cell(exchange, 1.0);
                    self.tech.add(slot, slot, cell);
                    self.add_cost(slot, exchange, 1.0);
                } else {
                    trace!(%provider, flow = exchange.flow_id, "co-product dropped from column");
                }
                continue;
            }

            let factor = if allocate { self.allocation.factor(provider, exchange) } else { 1.0 };

            if exchange.flow_type == FlowType::Elementary {
                let location = exchange.location_id.or(process_location);
                let row = self.flow_index.register(exchange.flow_id, location, exchange.is_input);
                let cell = self.exchange_cell(exchange, factor);
                self.enviro.add(row, slot, cell);
                self.add_cost(slot, exchange, factor);
                continue;
            }

            let key = LinkKey::new(exchange.process_id, exchange.exchange_id);
            match self.index.link_of(&key).and_then(|p| self.index.index_of(&p)) {
                Some(row) => {
                    let cell = self.exchange_cell(exchange, factor);
                    self.tech.add(row, slot, cell);
                }
                None => trace!(%provider, exchange = exchange.exchange_id, "unlinked exchange dropped"),
            }
            self.add_cost(slot, exchange, factor);
        }
    }

    fn add_sub_result(&mut self, slot: usize, sub: &SubResult) {
        self.tech.add(slot, slot, Cell::literal(sub.reference_amount));
        for flow in &sub.flows {
            let row = self.flow_index.register(flow.flow_id, flow.location_id, flow.is_input);
            self.enviro.add(row, slot, Cell::literal(flow.amount));
        }
        if self.config.with_costs {
            self.costs.add(slot, 0, Cell::literal(sub.total_costs));
        }
    }

    /// Inputs are negative, outputs positive. Avoided flows are stored on
    /// the opposite side and count with the sign of their natural side.
    fn exchange_cell(&self, exchange: &CalcExchange, allocation_factor: f64) -> Cell {
        let uncertainty = if self.config.with_uncertainties { exchange.uncertainty.clone() } else { None };
        Cell::new(
            CellValue::of(exchange.amount, exchange.formula.as_deref()),
            Some(ParameterContext::Process(exchange.process_id)),
        )
        .with_conversion_factor(exchange.conversion_factor)
        .negated(exchange.is_input != exchange.is_avoided)
        .with_allocation_factor(allocation_factor)
        .with_uncertainty(uncertainty)
    }

    /// Costs of inputs count positive, revenues of outputs negative.
    fn add_cost(&mut self, slot: usize, exchange: &CalcExchange, allocation_factor: f64) {
        if !self.config.with_costs {
            return;
        }
        let Some(cost) = exchange.cost_value else {
            return;
        };
        let cell = Cell::new(
            CellValue::of(cost, exchange.cost_formula.as_deref()),
            Some(ParameterContext::Process(exchange.process_id)),
        )
        .with_conversion_factor(exchange.currency_factor)
        .negated(exchange.is_input == exchange.is_avoided)
        .with_allocation_factor(allocation_factor);
        self.costs.add(slot, 0, cell);
    }
}
