//! Orchestrator: the public face of the memory engine.
//!
//! A query builds a probability field, scores the repository's candidates
//! into a superposition, detects interference, collapses to the dominant
//! states, and always finishes with a learning update before it returns.
//! Emergent detection runs inline, on a background thread, or not at all,
//! per [`InsightDelivery`].

use crate::config::{EngineConfig, InsightDelivery};
use crate::cycle::{QueryCycle, QueryPhase};
use crate::deferred::DeferredDetector;
use crate::emergence::{EmergenceContext, EmergenceReport, EmergentBehaviorEngine, EmergentMode};
use crate::error::{QpfmError, Result};
use crate::field::{FieldShapeFunction, PhaseFunction, ProbabilityField};
use crate::learning::{Interaction, InteractionRecord, LearningSystem, MaintenanceReport};
use crate::mapper::{CoordinateMapper, HarmonicCoordinateMapper};
use crate::metrics::{PerformanceMetrics, PerformanceTracker};
use crate::similarity::memory_similarity;
use crate::store::{CandidateRequest, InMemoryRepository, MemoryRepository};
use crate::superposition::{
    InterferenceDetector, InterferencePattern, MemoryState, Superposition, SuperpositionEngine,
    collapse,
};
use crate::types::{
    Coordinates, EmergentInsight, MemoryId, MemoryItem, MemoryQuery, QueryType,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};


/// Scores of one returned memory, aligned with [`QueryResult::memories`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryScore {
    /// Normalized field probability
    pub probability: f64,
    /// Square root of `probability`
    pub amplitude: f64,
    /// Phase in `[0, 2π)`
    pub phase: f64,
    /// Remaining energy needed to fire; zero means it fired
    pub activation_energy: f64,
}

impl From<&Superposition> for MemoryScore {
    fn from(superposition: &Superposition) -> Self {
        Self {
            probability: superposition.probability,
            amplitude: superposition.amplitude,
            phase: superposition.phase,
            activation_energy: superposition.activation_energy,
        }
    }
}

/// Phase timings for one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExecutionMetrics {
    /// Field evaluation and normalization
    pub superposition_time: Duration,
    /// Interference detection over the dominant states
    pub interference_time: Duration,
    /// Dominant-state selection
    pub collapse_time: Duration,
    /// Wall time from validation to result assembly
    pub total_time: Duration,
    /// Candidates scored into the superposition
    pub memories_processed: usize,
    /// Interference patterns detected for the query
    pub emergent_patterns_found: usize,
}

/// Response to [`QuantumMemoryEngine::query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Dominant states, most probable first, as they were when retrieved
    pub memories: Vec<MemoryItem>,
    /// One entry per returned memory, same order
    pub scores: Vec<MemoryScore>,
    /// Insights from an inline detection pass; empty otherwise
    pub emergent_insights: Vec<EmergentInsight>,
    /// Groupings found among the returned memories
    pub interference_patterns: Vec<InterferencePattern>,
    /// Coherence of the full superposition
    pub coherence_level: f64,
    /// The field the query resolved to
    pub field_configuration: ProbabilityField,
    /// Per-phase timings
    pub execution_metrics: ExecutionMetrics,
}

impl QueryResult {
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.memories.iter().map(|m| m.id.as_str()).collect()
    }
}

/// Options for [`QuantumMemoryEngine::find_similar`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityOptions {
    /// Upper bound on returned neighbours
    pub max_results: usize,
    /// Field radius; defaults to the discovery radius
    pub radius: Option<f64>,
    /// Keep the anchor itself in the results
    pub include_self: bool,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            radius: None,
            include_self: false,
        }
    }
}

/// One neighbour found by [`QuantumMemoryEngine::find_similar`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarMemory {
    /// Snapshot of the neighbour
    pub memory: MemoryItem,
    /// Normalized field probability around the anchor
    pub probability: f64,
    /// Pairwise similarity to the anchor
    pub similarity: f64,
}

/// Engine-wide counts and performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    /// Items in the repository
    pub memory_count: usize,
    /// Spatial clusters tracked by the learning system
    pub cluster_count: usize,
    /// Pairs with a non-zero association
    pub association_count: usize,
    /// Snapshot of the query counters
    pub performance: PerformanceMetrics,
}

/// Assembles a [`QuantumMemoryEngine`] with optional custom collaborators.
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    repository: Option<Arc<dyn MemoryRepository>>,
    mapper: Option<Arc<dyn CoordinateMapper>>,
    shape: Option<Arc<dyn FieldShapeFunction>>,
    phase: Option<Arc<dyn PhaseFunction>>,
    detector: Option<InterferenceDetector>,
}

impl EngineBuilder {
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn repository(mut self, repository: Arc<dyn MemoryRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    #[must_use]
    pub fn coordinate_mapper(mut self, mapper: Arc<dyn CoordinateMapper>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    #[must_use]
    pub fn field_shape(mut self, shape: Arc<dyn FieldShapeFunction>) -> Self {
        self.shape = Some(shape);
        self
    }

    #[must_use]
    pub fn phase_function(mut self, phase: Arc<dyn PhaseFunction>) -> Self {
        self.phase = Some(phase);
        self
    }

    #[must_use]
    pub fn interference_detector(mut self, detector: InterferenceDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Validate the configuration and build the engine.
    pub fn build(self) -> Result<QuantumMemoryEngine> {
        self.config.validate()?;
        let defaults = SuperpositionEngine::new();
        let mut superposition = match (self.shape, self.phase) {
            (None, None) => defaults,
            (shape, phase) => SuperpositionEngine::with_strategies(
                shape.unwrap_or_else(|| Arc::new(crate::field::StandardFalloff)),
                phase.unwrap_or_else(|| Arc::new(crate::field::HarmonicPhase::default())),
            ),
        };
        if let Some(detector) = self.detector {
            superposition = superposition.with_detector(detector);
        }

        let emergence = Arc::new(EmergentBehaviorEngine::new(&self.config));
        let metrics = Arc::new(PerformanceTracker::new(&self.config.performance_targets));
        let deferred = match self.config.insight_delivery {
            InsightDelivery::Deferred => Some(DeferredDetector::start(
                Arc::clone(&emergence),
                Arc::clone(&metrics),
            )?),
            InsightDelivery::Inline | InsightDelivery::Disabled => None,
        };

        Ok(QuantumMemoryEngine {
            repository: self
                .repository
                .unwrap_or_else(|| Arc::new(InMemoryRepository::new())),
            mapper: self
                .mapper
                .unwrap_or_else(|| Arc::new(HarmonicCoordinateMapper)),
            superposition,
            learning: LearningSystem::new(&self.config),
            emergence,
            metrics,
            last_query: Mutex::new(None),
            deferred,
            config: self.config,
        })
    }
}

/// In-process memory engine over a repository of harmonic memories.
///
/// All operations take `&self`; the engine is `Send + Sync` and may be
/// shared across threads behind an `Arc`.
#[derive(Debug)]
pub struct QuantumMemoryEngine {
    config: EngineConfig,
    repository: Arc<dyn MemoryRepository>,
    mapper: Arc<dyn CoordinateMapper>,
    superposition: SuperpositionEngine,
    learning: LearningSystem,
    emergence: Arc<EmergentBehaviorEngine>,
    metrics: Arc<PerformanceTracker>,
    last_query: Mutex<Option<Instant>>,
    /// Background detection worker, present only for deferred delivery
    deferred: Option<DeferredDetector>,
}

impl QuantumMemoryEngine {
    /// Engine over an in-memory repository.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn repository(&self) -> &dyn MemoryRepository {
        &*self.repository
    }

    #[must_use]
    pub const fn learning(&self) -> &LearningSystem {
        &self.learning
    }

    /// Validate and store a new item, placing it in a spatial cluster.
    pub fn store(&self, item: MemoryItem) -> Result<MemoryId> {
        let id = item.id.clone();
        self.learning.integrate_new_memory(&*self.repository, item)?;
        tracing::debug!(memory_id = %id, "memory stored");
        Ok(id)
    }

    /// Store a batch atomically with respect to validation, then mine associations.
    pub fn bulk_store(&self, items: Vec<MemoryItem>) -> Result<Vec<MemoryId>> {
        let ids: Vec<MemoryId> = items.iter().map(|item| item.id.clone()).collect();
        self.learning.batch_integrate(&*self.repository, items)?;
        Ok(ids)
    }

    /// Run one query end to end.
    ///
    /// Fails with [`QpfmError::Validation`] for a malformed query,
    /// [`QpfmError::CandidatesUnavailable`] when the repository
    /// cannot be read and [`QpfmError::DeadlineExceeded`] when the
    /// urgency-derived budget runs out; in every case no learning happens.
    /// An empty repository is not an error.
    pub fn query(&self, query: &MemoryQuery) -> Result<QueryResult> {
        query.validate()?;
        let started = Instant::now();
        let budget = self.config.performance_targets.deadline_for(query.urgency);
        let mut cycle = QueryCycle::new();

        let field = ProbabilityField::for_query(query, self.field_center(query), &self.config.field);
        cycle.advance(QueryPhase::FieldBuilt);

        let candidates = match self.repository.snapshot(&candidate_request(query)) {
            Ok(candidates) => candidates,
            Err(source) => {
                cycle.abort();
                tracing::warn!(error = %source, "candidate fetch failed");
                return Err(QpfmError::from(source));
            }
        };
        self.check_deadline("candidate fetch", started, budget, &mut cycle)?;

        let phase_start = Instant::now();
        let superpositions = self.superposition.superpose(&field, &candidates);
        let superposition_time = phase_start.elapsed();
        cycle.advance(QueryPhase::Superposed);
        self.check_deadline("superposition", started, budget, &mut cycle)?;

        let phase_start = Instant::now();
        let patterns = self.superposition.interference(&superpositions);
        let interference_time = phase_start.elapsed();
        self.check_deadline("interference", started, budget, &mut cycle)?;

        let phase_start = Instant::now();
        let memories_processed = superpositions.len();
        let state = collapse(superpositions, patterns);
        let max_results = query
            .max_results
            .unwrap_or(self.config.field.default_max_results);
        let returned: Vec<&Superposition> = state.dominant_states.iter().take(max_results).collect();
        let collapse_time = phase_start.elapsed();
        cycle.advance(QueryPhase::Scored);

        let returned_ids: Vec<MemoryId> = returned.iter().map(|s| s.id().clone()).collect();
        self.learning.process_interaction(
            &*self.repository,
            &Interaction {
                query,
                returned: &returned_ids,
                coherence_level: state.coherence_level,
                patterns: &state.interference_patterns,
                timestamp: Utc::now(),
            },
        );
        cycle.advance(QueryPhase::Learned);

        let context = self.emergence_context();
        let emergent_insights = match self.config.insight_delivery {
            InsightDelivery::Inline => {
                let report = self.emergence.detect(&state, &context, None);
                self.metrics.record_insights(report.insights.len());
                cycle.advance(QueryPhase::Emerged);
                report.insights
            }
            InsightDelivery::Deferred => {
                if let Some(detector) = &self.deferred {
                    detector.submit(state.clone(), context);
                }
                Vec::new()
            }
            InsightDelivery::Disabled => Vec::new(),
        };
        cycle.advance(QueryPhase::Idle);

        let total_time = started.elapsed();
        self.metrics.record_query(total_time, returned.len());
        *self.last_query.lock() = Some(Instant::now());

        tracing::debug!(
            query_type = query.query_type.as_str(),
            candidates = candidates.len(),
            returned = returned.len(),
            coherence = state.coherence_level,
            total_us = total_time.as_micros(),
            "query complete"
        );

        Ok(QueryResult {
            memories: returned.iter().map(|s| (*s.memory).clone()).collect(),
            scores: returned.iter().map(|s| MemoryScore::from(*s)).collect(),
            execution_metrics: ExecutionMetrics {
                superposition_time,
                interference_time,
                collapse_time,
                total_time,
                memories_processed,
                emergent_patterns_found: state.interference_patterns.len() + emergent_insights.len(),
            },
            emergent_insights,
            interference_patterns: state.interference_patterns.clone(),
            coherence_level: state.coherence_level,
            field_configuration: field,
        })
    }

    /// Neighbours of a stored memory under a field centred on it. Read-only.
    pub fn find_similar(&self, id: &str, options: &SimilarityOptions) -> Result<Vec<SimilarMemory>> {
        let anchor = self
            .repository
            .get(id)
            .map(|handle| handle.read().clone())
            .ok_or_else(|| QpfmError::UnknownMemory { id: id.to_string() })?;

        let query = MemoryQuery::new(QueryType::Discovery).with_exploration(0.0);
        let mut field = ProbabilityField::for_query(&query, anchor.coordinates, &self.config.field);
        if let Some(radius) = options.radius {
            field.radius = radius;
        }

        let candidates = self.repository.snapshot(&CandidateRequest::all())?;
        let superpositions = self.superposition.superpose(&field, &candidates);
        let mut neighbours: Vec<SimilarMemory> = superpositions
            .iter()
            .filter(|s| options.include_self || s.id() != id)
            .map(|s| SimilarMemory {
                similarity: memory_similarity(&anchor, &s.memory),
                probability: s.probability,
                memory: (*s.memory).clone(),
            })
            .collect();
        neighbours.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbours.truncate(options.max_results);
        Ok(neighbours)
    }

    /// Force one emergent mechanism over every stored memory.
    pub fn trigger_emergent_discovery(&self, mode: EmergentMode) -> Result<EmergenceReport> {
        let snapshot = self.repository.snapshot(&CandidateRequest::all())?;
        Ok(self
            .emergence
            .trigger_behavior(mode, &snapshot, &self.superposition))
    }

    /// Run emergent detection over an arbitrary state.
    pub fn detect_emergence(&self, state: &MemoryState, min_novelty: Option<f64>) -> EmergenceReport {
        self.emergence
            .detect(state, &self.emergence_context(), min_novelty)
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            memory_count: self.repository.len(),
            cluster_count: self.learning.cluster_count(),
            association_count: self.learning.associations().len(),
            performance: self.metrics.snapshot(),
        }
    }

    /// Decay associations and idle memories; verify cluster indexes.
    pub fn run_maintenance(&self) -> Result<MaintenanceReport> {
        self.learning.decay_pass(&*self.repository, Utc::now())
    }

    /// Symmetric association strength between two memories.
    #[must_use]
    pub fn association_strength(&self, a: &str, b: &str) -> f64 {
        self.learning.associations().strength(a, b)
    }

    #[must_use]
    pub fn recent_interactions(&self, limit: usize) -> Vec<InteractionRecord> {
        self.learning.recent_interactions(limit)
    }

    /// Wait for queued background detection passes, then drain their insights.
    ///
    /// Always empty unless the engine was built with deferred delivery.
    pub fn take_deferred_insights(&self) -> Vec<EmergentInsight> {
        self.deferred
            .as_ref()
            .map_or_else(Vec::new, DeferredDetector::drain)
    }

    /// Centre from the query signature, else the context window, else the cube centre.
    fn field_center(&self, query: &MemoryQuery) -> Coordinates {
        if let Some(signature) = &query.harmonic_signature {
            return self.mapper.map(signature);
        }
        let context: Vec<Coordinates> = query
            .context_window
            .iter()
            .filter_map(|id| self.repository.get(id))
            .map(|handle| handle.read().coordinates)
            .collect();
        Coordinates::centroid(&context).unwrap_or(Coordinates::CENTER)
    }

    fn check_deadline(
        &self,
        phase: &'static str,
        started: Instant,
        budget: Duration,
        cycle: &mut QueryCycle,
    ) -> Result<()> {
        let elapsed = started.elapsed();
        if elapsed <= budget {
            return Ok(());
        }
        cycle.abort();
        self.metrics.record_deadline_miss();
        tracing::warn!(
            phase,
            elapsed_ms = elapsed.as_millis(),
            budget_ms = budget.as_millis(),
            "query deadline exceeded"
        );
        Err(QpfmError::DeadlineExceeded {
            phase,
            elapsed,
            budget,
        })
    }

    fn emergence_context(&self) -> EmergenceContext {
        let previous = *self.last_query.lock();
        let idle_for = previous.map_or(Duration::ZERO, |at| at.elapsed());
        EmergenceContext {
            idle_for,
            query_count: self.metrics.query_count() + 1,
        }
    }
}

/// Precision queries with a signature only consider that signature's category.
fn candidate_request(query: &MemoryQuery) -> CandidateRequest {
    match (&query.query_type, &query.harmonic_signature) {
        (QueryType::Precision, Some(signature)) => CandidateRequest::in_category(signature.category),
        _ => CandidateRequest::all(),
    }
}
