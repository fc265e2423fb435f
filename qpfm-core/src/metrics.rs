//! Lock-free query instrumentation.
//!
//! Counters are updated from concurrent queries without locking; a
//! [`PerformanceMetrics`] snapshot is assembled on demand for `stats()`.

use crate::config::PerformanceTargets;
use crate::numeric::{safe_ratio, u64_to_f64};
use atomic_float::AtomicF64;
use crossbeam_utils::CachePadded;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Aggregate counters for completed queries and detection passes.
#[derive(Debug)]
pub struct PerformanceTracker {
    queries: CachePadded<AtomicU64>,
    hits: CachePadded<AtomicU64>,
    /// Sum of query response times in milliseconds
    response_ms: CachePadded<AtomicF64>,
    insights: CachePadded<AtomicU64>,
    /// Queries whose detection pass produced at least one insight
    emergent_queries: CachePadded<AtomicU64>,
    overruns: CachePadded<AtomicU64>,
    deadline_misses: CachePadded<AtomicU64>,
    max_query_time: Duration,
}

impl PerformanceTracker {
    #[must_use]
    pub fn new(targets: &PerformanceTargets) -> Self {
        Self {
            queries: CachePadded::new(AtomicU64::new(0)),
            hits: CachePadded::new(AtomicU64::new(0)),
            response_ms: CachePadded::new(AtomicF64::new(0.0)),
            insights: CachePadded::new(AtomicU64::new(0)),
            emergent_queries: CachePadded::new(AtomicU64::new(0)),
            overruns: CachePadded::new(AtomicU64::new(0)),
            deadline_misses: CachePadded::new(AtomicU64::new(0)),
            max_query_time: Duration::from_millis(targets.max_query_time_ms),
        }
    }

    /// Record a completed query. Returns `true` if it overran the SLA.
    pub fn record_query(&self, elapsed: Duration, returned: usize) -> bool {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if returned > 0 {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        self.response_ms
            .fetch_add(elapsed.as_secs_f64() * 1_000.0, Ordering::Relaxed);
        let overran = elapsed > self.max_query_time;
        if overran {
            self.overruns.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                elapsed_ms = elapsed.as_millis(),
                target_ms = self.max_query_time.as_millis(),
                "query exceeded target response time"
            );
        }
        overran
    }

    pub fn record_insights(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.insights
            .fetch_add(u64::try_from(count).unwrap_or(u64::MAX), Ordering::Relaxed);
        self.emergent_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deadline_miss(&self) {
        self.deadline_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn snapshot(&self) -> PerformanceMetrics {
        let queries = self.queries.load(Ordering::Acquire);
        let hits = self.hits.load(Ordering::Acquire);
        let total_ms = self.response_ms.load(Ordering::Acquire);
        let emergent = self.emergent_queries.load(Ordering::Acquire);
        let denominator = u64_to_f64(queries.max(1));
        PerformanceMetrics {
            total_queries: queries,
            average_response_time_ms: if queries == 0 { 0.0 } else { total_ms / denominator },
            hit_rate: if queries == 0 { 0.0 } else { safe_ratio(u64_to_f64(hits), denominator) },
            emergence_frequency: if queries == 0 {
                0.0
            } else {
                safe_ratio(u64_to_f64(emergent), denominator)
            },
            insights_generated: self.insights.load(Ordering::Acquire),
            sla_overruns: self.overruns.load(Ordering::Acquire),
            deadline_misses: self.deadline_misses.load(Ordering::Acquire),
        }
    }
}

/// Point-in-time view of [`PerformanceTracker`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Queries that completed
    pub total_queries: u64,
    /// Mean wall time per query
    pub average_response_time_ms: f64,
    /// Fraction of queries that returned at least one memory
    pub hit_rate: f64,
    /// Fraction of queries whose detection pass produced an insight
    pub emergence_frequency: f64,
    /// Insights produced across all passes
    pub insights_generated: u64,
    /// Queries slower than `max_query_time_ms`
    pub sla_overruns: u64,
    /// Queries that ran past their deadline
    pub deadline_misses: u64,
}
