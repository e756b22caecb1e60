//! The persistence seam.
//!
//! The engine never talks to a database directly; it reads snapshot records
//! through [`MatrixSource`]. All calls are batched by id.

pub mod cache;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::{
    AllocationFactor, CalcExchange, CalcImpactFactor, ImpactId, Parameter, ParameterContext,
    ProcessId, ProviderInfo,
};

pub use cache::{MatrixCache, ProviderTable};
pub use memory::InMemorySource;

#[async_trait]
pub trait MatrixSource: Send + Sync {
    /// All rows of the provider table.
    async fn providers(&self) -> Result<Vec<ProviderInfo>>;

    /// Exchanges of the given processes. Processes without exchanges may be
    /// missing from the returned map.
    async fn exchanges(&self, processes: &[ProcessId]) -> Result<HashMap<ProcessId, Vec<CalcExchange>>>;

    async fn impact_factors(&self, impacts: &[ImpactId]) -> Result<HashMap<ImpactId, Vec<CalcImpactFactor>>>;

    /// Global parameters plus the local parameters of the given contexts.
    async fn parameters(&self, contexts: &[ParameterContext]) -> Result<Vec<Parameter>>;

    async fn allocation_factors(
        &self,
        processes: &[ProcessId],
    ) -> Result<HashMap<ProcessId, Vec<AllocationFactor>>>;
}
