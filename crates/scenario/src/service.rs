//! Bounded-latency lookup service over a hot-swappable index.
//!
//! Queries clone the current `Arc<ScenarioIndex>` under a momentary read
//! lock and search it lock-free. A swap installs a new index under the
//! write lock; queries already running finish against the index they
//! started with.

use crate::error::ScenarioError;
use crate::index::{LookupConfig, ScenarioIndex};
use crate::key::LiveQuery;
use crate::record::Recommendation;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Read-only figures for reporting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_scenarios: usize,
    pub queries: u64,
    pub hits: u64,
    pub exact_hits: u64,
    pub no_coverage: u64,
    pub timeouts: u64,
    pub average_latency_ms: f64,
    pub last_latency_ms: f64,
    pub latency_budget_ms: f64,
    pub database_bytes: u64,
    /// Baseline computation time over the average query latency; 0 before
    /// the first query.
    pub speedup_factor: f64,
    pub position_coverage: f32,
    pub source_checkpoint: Option<String>,
    pub built_at: String,
    pub swaps: u64,
}

#[derive(Default)]
struct Counters {
    queries: AtomicU64,
    hits: AtomicU64,
    exact_hits: AtomicU64,
    no_coverage: AtomicU64,
    timeouts: AtomicU64,
    total_latency_ns: AtomicU64,
    last_latency_ns: AtomicU64,
    swaps: AtomicU64,
}

pub struct LookupService {
    index: RwLock<Arc<ScenarioIndex>>,
    counters: Counters,
}

impl LookupService {
    #[must_use]
    pub fn new(index: ScenarioIndex) -> Self {
        Self { index: RwLock::new(Arc::new(index)), counters: Counters::default() }
    }

    /// # Errors
    ///
    /// See [`ScenarioIndex::open`].
    pub fn open(path: &Path, config: LookupConfig) -> Result<Self, ScenarioError> {
        Ok(Self::new(ScenarioIndex::open(path, config)?))
    }

    /// The index new queries run against.
    #[must_use]
    pub fn current(&self) -> Arc<ScenarioIndex> {
        Arc::clone(&*self.index.read())
    }

    /// Install `index`, returning the one it replaces.
    pub fn swap(&self, index: ScenarioIndex) -> Arc<ScenarioIndex> {
        let records = index.len();
        let checksum = index.meta().checksum.clone();
        let old = std::mem::replace(&mut *self.index.write(), Arc::new(index));
        self.counters.swaps.fetch_add(1, Ordering::Relaxed);
        info!(records, %checksum, previous = %old.meta().checksum, "scenario index swapped");
        old
    }

    /// Load `path` with the current lookup configuration and swap it in.
    /// On failure the current index stays in place.
    ///
    /// # Errors
    ///
    /// See [`ScenarioIndex::open`].
    pub fn reload(&self, path: &Path) -> Result<(), ScenarioError> {
        let config = self.current().config().clone();
        self.swap(ScenarioIndex::open(path, config)?);
        Ok(())
    }

    /// Answer within the configured latency budget.
    ///
    /// # Errors
    ///
    /// [`ScenarioError::NoCoverage`] or [`ScenarioError::QueryTimeout`];
    /// a result found after the budget ran out is discarded as a timeout.
    pub fn lookup(&self, query: &LiveQuery) -> Result<Recommendation, ScenarioError> {
        let index = self.current();
        let budget_ms = index.config().latency_budget_ms;
        let budget = Duration::try_from_secs_f64(budget_ms.max(0.0) / 1e3).unwrap_or(Duration::MAX);
        let started = Instant::now();
        let mut result = match started.checked_add(budget) {
            Some(deadline) => index.lookup_before(query, deadline),
            None => index.lookup(query),
        };
        let elapsed = started.elapsed();
        if result.is_ok() && elapsed > budget {
            result = Err(ScenarioError::QueryTimeout { budget_ms });
        }
        self.record(&result, elapsed);
        if let Err(e) = &result {
            debug!(
                distance = query.distance,
                speed_kmh = query.speed_kmh,
                compound = %query.compound,
                weather = %query.weather,
                error = %e,
                "lookup fell back"
            );
        }
        result
    }

    fn record(&self, result: &Result<Recommendation, ScenarioError>, elapsed: Duration) {
        let c = &self.counters;
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        c.queries.fetch_add(1, Ordering::Relaxed);
        c.total_latency_ns.fetch_add(ns, Ordering::Relaxed);
        c.last_latency_ns.store(ns, Ordering::Relaxed);
        let counter = match result {
            Ok(r) if r.exact => {
                c.exact_hits.fetch_add(1, Ordering::Relaxed);
                &c.hits
            }
            Ok(_) => &c.hits,
            Err(ScenarioError::QueryTimeout { .. }) => &c.timeouts,
            Err(_) => &c.no_coverage,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn stats(&self) -> AggregateStats {
        let index = self.current();
        let c = &self.counters;
        let queries = c.queries.load(Ordering::Relaxed);
        let average_latency_ms = if queries == 0 {
            0.0
        } else {
            c.total_latency_ns.load(Ordering::Relaxed) as f64 / queries as f64 / 1e6
        };
        let baseline_ms = index.config().baseline_compute_s * 1e3;
        AggregateStats {
            total_scenarios: index.len(),
            queries,
            hits: c.hits.load(Ordering::Relaxed),
            exact_hits: c.exact_hits.load(Ordering::Relaxed),
            no_coverage: c.no_coverage.load(Ordering::Relaxed),
            timeouts: c.timeouts.load(Ordering::Relaxed),
            average_latency_ms,
            last_latency_ms: c.last_latency_ns.load(Ordering::Relaxed) as f64 / 1e6,
            latency_budget_ms: index.config().latency_budget_ms,
            database_bytes: index.encoded_bytes(),
            speedup_factor: if average_latency_ms > 0.0 { baseline_ms / average_latency_ms } else { 0.0 },
            position_coverage: index.meta().position_coverage,
            source_checkpoint: index.meta().source_checkpoint.clone(),
            built_at: index.meta().built_at.clone(),
            swaps: c.swaps.load(Ordering::Relaxed),
        }
    }
}
