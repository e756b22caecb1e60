#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lca_engine::domain::{
    AllocationFactor, CalcExchange, CalcImpactFactor, ImpactId, Parameter, ParameterContext, ProcessId,
    ProviderInfo,
};
use lca_engine::solver::DenseSolver;
use lca_engine::source::{InMemorySource, MatrixCache, MatrixSource};
use lca_engine::SystemCalculator;

pub const TOLERANCE: f64 = 1e-10;

pub fn calculator(source: impl MatrixSource + 'static) -> SystemCalculator {
    SystemCalculator::new(Arc::new(MatrixCache::new(Arc::new(source))), Arc::new(DenseSolver))
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

/// Wraps an [`InMemorySource`] and fails exchange fetches that include the
/// given process, a limited number of times.
pub struct FlakySource {
    inner: InMemorySource,
    failing_process: ProcessId,
    failures_left: AtomicUsize,
}

impl FlakySource {
    pub fn new(inner: InMemorySource, failing_process: ProcessId, failures: usize) -> Self {
        Self {
            inner,
            failing_process,
            failures_left: AtomicUsize::new(failures),
        }
    }

    pub fn always_failing(inner: InMemorySource, failing_process: ProcessId) -> Self {
        Self::new(inner, failing_process, usize::MAX)
    }
}

#[async_trait]
impl MatrixSource for FlakySource {
    async fn providers(&self) -> Result<Vec<ProviderInfo>> {
        self.inner.providers().await
    }

    async fn exchanges(&self, processes: &[ProcessId]) -> Result<HashMap<ProcessId, Vec<CalcExchange>>> {
        if processes.contains(&self.failing_process) {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                if left != usize::MAX {
                    self.failures_left.store(left - 1, Ordering::SeqCst);
                }
                bail!("connection reset while loading process {}", self.failing_process);
            }
        }
        self.inner.exchanges(processes).await
    }

    async fn impact_factors(&self, impacts: &[ImpactId]) -> Result<HashMap<ImpactId, Vec<CalcImpactFactor>>> {
        self.inner.impact_factors(impacts).await
    }

    async fn parameters(&self, contexts: &[ParameterContext]) -> Result<Vec<Parameter>> {
        self.inner.parameters(contexts).await
    }

    async fn allocation_factors(
        &self,
        processes: &[ProcessId],
    ) -> Result<HashMap<ProcessId, Vec<AllocationFactor>>> {
        self.inner.allocation_factors(processes).await
    }
}
