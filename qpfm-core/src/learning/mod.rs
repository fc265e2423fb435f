//! Learning system: how the field reshapes itself after every query.
//!
//! Each completed query reinforces the items it returned (Hebbian
//! resonance, activation, confidence), strengthens associations between
//! co-retrieved items, and pulls them toward each other in coordinate space.
//! New items are placed into spatial clusters on ingest.
//!
//! Writes to one item go through that item's [`MemoryHandle`] write lock and
//! association cells are updated under their DashMap shard lock, so
//! concurrent queries sharing an item never lose updates. Cluster membership
//! sits behind a single `RwLock`, always taken before any item lock.

pub mod associations;
pub mod clusters;

pub use associations::{AssociationMatrix, AssociationStatistics, PRUNE_BELOW};
pub use clusters::{CLUSTER_JOIN_THRESHOLD, ClusterId, ClusterMatch, SpatialClusters};

use crate::config::{ConfidenceEvolutionConfig, EngineConfig, HebbianConfig, SpatialAdaptationConfig};
use crate::error::{QpfmError, RepositoryError, Result};
use crate::similarity::memory_similarity;
use crate::store::{MemoryHandle, MemoryRepository};
use crate::superposition::InterferencePattern;
use crate::types::{AccessEvent, Coordinates, MemoryId, MemoryItem, MemoryQuery, QueryType};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

/// Interaction records kept before the oldest is evicted.
pub const INTERACTION_HISTORY_CAPACITY: usize = 1_000;

/// Coherence a query must exceed to count as a success.
pub const SUCCESS_COHERENCE: f64 = 0.7;

/// Confidence below which the uncertainty decay applies.
pub const LOW_CONFIDENCE: f64 = 0.4;

pub const MIN_CONFIDENCE: f64 = 0.1;

/// Similarity two items of one batch need before they are associated.
pub const BATCH_ASSOCIATION_THRESHOLD: f64 = 0.6;

/// Starting confidence and resonance of a newly integrated item.
pub const INITIAL_SCORE: f64 = 0.5;

/// A completed query, as seen by the learning step.
#[derive(Debug, Clone, Copy)]
pub struct Interaction<'a> {
    /// The query as submitted
    pub query: &'a MemoryQuery,
    /// Returned ids, best first
    pub returned: &'a [MemoryId],
    /// Coherence of the query's superposition
    pub coherence_level: f64,
    /// Patterns detected among the returned items
    pub patterns: &'a [InterferencePattern],
    /// When the query completed
    pub timestamp: DateTime<Utc>,
}

/// One entry of the learning history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionRecord {
    /// When the query completed
    pub timestamp: DateTime<Utc>,
    /// Mode of the query
    pub query_type: QueryType,
    /// Number of memories returned
    pub returned: usize,
    /// Coherence of the query's superposition
    pub coherence_level: f64,
    /// Whether coherence exceeded the success threshold
    pub success: bool,
}

/// What a learning step changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LearningReport {
    /// Returned items that were reinforced
    pub items_updated: usize,
    /// Pairs strengthened
    pub associations_touched: usize,
    /// Items moved by spatial adaptation
    pub items_moved: usize,
    /// Items that joined or left a cluster
    pub cluster_changes: usize,
}

/// What a maintenance pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Associations removed after decaying to zero
    pub associations_pruned: usize,
    /// Idle items that lost resonance
    pub items_decayed: usize,
    /// Whether every clustered item still exists
    pub clusters_consistent: bool,
}

#[derive(Debug)]
pub struct LearningSystem {
    hebbian: HebbianConfig,
    confidence: ConfidenceEvolutionConfig,
    spatial: SpatialAdaptationConfig,
    associations: AssociationMatrix,
    clusters: RwLock<SpatialClusters>,
    history: Mutex<VecDeque<InteractionRecord>>,
}

impl LearningSystem {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            hebbian: config.hebbian_strengthening.clone(),
            confidence: config.confidence_evolution.clone(),
            spatial: config.spatial_adaptation.clone(),
            associations: AssociationMatrix::new(),
            clusters: RwLock::new(SpatialClusters::new()),
            history: Mutex::new(VecDeque::with_capacity(INTERACTION_HISTORY_CAPACITY)),
        }
    }

    #[must_use]
    pub const fn associations(&self) -> &AssociationMatrix {
        &self.associations
    }

    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.clusters.read().len()
    }

    #[must_use]
    pub fn cluster_of(&self, id: &str) -> Option<ClusterId> {
        self.clusters.read().cluster_of(id)
    }

    #[must_use]
    pub fn cluster_mates(&self, id: &str) -> Vec<MemoryId> {
        self.clusters.read().cluster_mates(id)
    }

    /// Reinforce the returned items of a completed query.
    pub fn process_interaction(
        &self,
        repository: &dyn MemoryRepository,
        interaction: &Interaction<'_>,
    ) -> LearningReport {
        let mut report = LearningReport::default();
        let success = interaction.coherence_level > SUCCESS_COHERENCE;
        let n = interaction.returned.len();

        let mut handles: Vec<(MemoryId, MemoryHandle)> = Vec::with_capacity(n);
        for (rank, id) in interaction.returned.iter().enumerate() {
            let Some(handle) = repository.get(id) else {
                tracing::debug!(memory_id = %id, "returned memory vanished before learning");
                continue;
            };
            let relevance = rank_relevance(rank, n);
            {
                let mut item = handle.write();
                reinforce_item(
                    &mut item,
                    &self.hebbian,
                    &self.confidence,
                    ItemOutcome {
                        relevance,
                        success,
                        query_type: interaction.query.query_type,
                        timestamp: interaction.timestamp,
                    },
                );
            }
            report.items_updated += 1;
            handles.push((id.clone(), handle));
        }

        for (i, (a, _)) in handles.iter().enumerate() {
            for (b, _) in &handles[i + 1..] {
                self.associations
                    .strengthen(a, b, self.hebbian.associative_bonus);
                report.associations_touched += 1;
            }
        }

        let pattern_bonus = 2.0 * self.hebbian.associative_bonus;
        for pattern in interaction.patterns {
            for (a, b) in pattern.member_pairs() {
                self.associations.strengthen(a, b, pattern_bonus);
                report.associations_touched += 1;
            }
        }

        if self.spatial.enabled && handles.len() >= 2 {
            let (moved, changes) = self.adapt_positions(repository, &handles);
            report.items_moved = moved;
            report.cluster_changes = changes;
        }

        self.record_history(InteractionRecord {
            timestamp: interaction.timestamp,
            query_type: interaction.query.query_type,
            returned: n,
            coherence_level: interaction.coherence_level,
            success,
        });

        tracing::debug!(
            items = report.items_updated,
            associations = report.associations_touched,
            moved = report.items_moved,
            success,
            "learning step applied"
        );
        report
    }

    /// Drift returned items toward their centroid, then re-cluster them.
    fn adapt_positions(
        &self,
        repository: &dyn MemoryRepository,
        handles: &[(MemoryId, MemoryHandle)],
    ) -> (usize, usize) {
        let positions: Vec<Coordinates> = handles.iter().map(|(_, h)| h.read().coordinates).collect();
        let Some(centroid) = Coordinates::centroid(&positions) else {
            return (0, 0);
        };
        let rates = axis_rates(&self.spatial, &positions);

        let mut moved = 0;
        for (_, handle) in handles {
            let mut item = handle.write();
            let target = drift(&item.coordinates, &centroid, rates, self.spatial.boundary_flexibility);
            if target != item.coordinates {
                item.coordinates = target;
                moved += 1;
            }
        }

        let mut clusters = self.clusters.write();
        let mut changes = 0;
        for (_, handle) in handles {
            let snapshot = handle.read().clone();
            if reassign(&mut clusters, repository, &snapshot) {
                changes += 1;
            }
        }
        (moved, changes)
    }

    /// Validate, initialize, store, and cluster a single new item.
    pub fn integrate_new_memory(
        &self,
        repository: &dyn MemoryRepository,
        mut item: MemoryItem,
    ) -> Result<MemoryHandle> {
        item.validate()?;
        item.confidence_score = INITIAL_SCORE;
        item.resonance_strength = INITIAL_SCORE;

        let mut clusters = self.clusters.write();
        let placement = clusters.best_match(&item.id, |other| {
            repository
                .get(other)
                .map(|handle| memory_similarity(&item, &handle.read()))
        });
        let id = item.id.clone();
        let handle = repository.insert(item).map_err(|error| match error {
            RepositoryError::Duplicate { id } => {
                QpfmError::validation(&id, "an item with this id is already stored")
            }
            other => QpfmError::StoreFailed {
                id: id.clone(),
                source: other,
            },
        })?;
        match placement {
            Some(found) => {
                tracing::trace!(memory_id = %id, similarity = found.similarity, "joined cluster");
                clusters.assign(&id, found.cluster);
            }
            None => {
                clusters.create_singleton(&id);
            }
        }
        Ok(handle)
    }

    /// Integrate a batch, then associate similar items within it.
    ///
    /// Every item is validated before any is stored, so a malformed batch
    /// leaves the repository untouched.
    pub fn batch_integrate(
        &self,
        repository: &dyn MemoryRepository,
        items: Vec<MemoryItem>,
    ) -> Result<Vec<MemoryHandle>> {
        let mut seen = BTreeSet::new();
        for item in &items {
            item.validate()?;
            if !seen.insert(item.id.as_str()) {
                return Err(QpfmError::validation(&item.id, "id appears twice in the batch"));
            }
        }
        drop(seen);

        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            handles.push(self.integrate_new_memory(repository, item)?);
        }

        let snapshots: Vec<MemoryItem> = handles.iter().map(|h| h.read().clone()).collect();
        let mut mined = 0;
        for (i, a) in snapshots.iter().enumerate() {
            for b in &snapshots[i + 1..] {
                let similarity = memory_similarity(a, b);
                if similarity > BATCH_ASSOCIATION_THRESHOLD {
                    self.associations.reinforce_to(&a.id, &b.id, similarity);
                    mined += 1;
                }
            }
        }
        tracing::debug!(items = handles.len(), associations = mined, "batch integrated");
        Ok(handles)
    }

    /// Decay associations and idle items, then check cluster consistency.
    pub fn decay_pass(
        &self,
        repository: &dyn MemoryRepository,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceReport> {
        let associations_pruned = self.associations.decay(self.hebbian.weaken_rate);
        let idle_window = chrono::Duration::from_std(self.hebbian.idle_window())
            .unwrap_or(chrono::Duration::MAX);

        let mut items_decayed = 0;
        for handle in repository.all()? {
            let mut item = handle.write();
            let last_seen = item
                .access_history
                .back()
                .map_or(item.last_evolution, |event| event.timestamp);
            if now.signed_duration_since(last_seen) > idle_window {
                item.resonance_strength = (item.resonance_strength - self.hebbian.weaken_rate).max(0.0);
                let relax = (item.resting_potential - item.current_activation) * self.hebbian.weaken_rate;
                item.current_activation += relax;
                items_decayed += 1;
            }
        }

        let clusters_consistent = self.clusters.write().verify_consistency();
        tracing::debug!(
            pruned = associations_pruned,
            decayed = items_decayed,
            clusters_consistent,
            "maintenance pass complete"
        );
        Ok(MaintenanceReport {
            associations_pruned,
            items_decayed,
            clusters_consistent,
        })
    }

    /// The most recent `limit` interactions, oldest first.
    #[must_use]
    pub fn recent_interactions(&self, limit: usize) -> Vec<InteractionRecord> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    fn record_history(&self, record: InteractionRecord) {
        let mut history = self.history.lock();
        history.push_back(record);
        while history.len() > INTERACTION_HISTORY_CAPACITY {
            history.pop_front();
        }
    }
}

/// Relevance of the item at `rank` among `n` returned items.
#[must_use]
pub fn rank_relevance(rank: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    1.0 - crate::numeric::usize_to_f64(rank) / crate::numeric::usize_to_f64(n)
}

/// Per-item inputs to a reinforcement step.
#[derive(Debug, Clone, Copy)]
pub struct ItemOutcome {
    /// Rank-derived relevance in `[0,1]`
    pub relevance: f64,
    /// Whether the query counted as successful
    pub success: bool,
    /// Mode of the query
    pub query_type: QueryType,
    /// Timestamp of the recorded access
    pub timestamp: DateTime<Utc>,
}

/// Access event, Hebbian step, and confidence step for one item.
pub fn reinforce_item(
    item: &mut MemoryItem,
    hebbian: &HebbianConfig,
    confidence: &ConfidenceEvolutionConfig,
    outcome: ItemOutcome,
) {
    item.record_access(AccessEvent {
        timestamp: outcome.timestamp,
        query_type: outcome.query_type,
        success: outcome.relevance > 0.5,
        activation: item.current_activation,
    });

    item.resonance_strength = hebbian
        .strengthen_rate
        .mul_add(outcome.relevance, item.resonance_strength)
        .min(1.0);
    item.current_activation = hebbian
        .strengthen_rate
        .mul_add(0.5, item.current_activation)
        .min(item.threshold);

    let step = if outcome.success {
        confidence.success_bonus
    } else {
        -confidence.failure_penalty
    };
    let mut score = step
        .mul_add(outcome.relevance, item.confidence_score)
        .clamp(MIN_CONFIDENCE, 1.0);
    if score < LOW_CONFIDENCE {
        score = (score * (1.0 - confidence.uncertainty_decay)).max(MIN_CONFIDENCE);
    }
    item.confidence_score = score;
    item.last_evolution = outcome.timestamp;
}

/// Per-axis drift rates, scaled by spread when dimensional optimization is on.
fn axis_rates(spatial: &SpatialAdaptationConfig, positions: &[Coordinates]) -> [f64; 3] {
    let rate = spatial.clustering_rate;
    if !spatial.dimensional_optimization {
        return [rate; 3];
    }
    let spread = |axis: fn(&Coordinates) -> f64| {
        let (lo, hi) = positions
            .iter()
            .map(axis)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        (hi - lo).max(0.0)
    };
    let spreads = [spread(|c| c.x), spread(|c| c.y), spread(|c| c.z)];
    let widest = crate::numeric::floored(spreads.iter().copied().fold(0.0, f64::max), f64::EPSILON);
    spreads.map(|s| rate * s / widest)
}

/// Step from `position` toward `target`, capped at `max_step` and clamped to the cube.
fn drift(position: &Coordinates, target: &Coordinates, rates: [f64; 3], max_step: f64) -> Coordinates {
    let mut delta = [
        (target.x - position.x) * rates[0],
        (target.y - position.y) * rates[1],
        (target.z - position.z) * rates[2],
    ];
    let length = delta.iter().map(|d| d * d).sum::<f64>().sqrt();
    if length > max_step && length > 0.0 {
        let scale = max_step / length;
        for d in &mut delta {
            *d *= scale;
        }
    }
    Coordinates::new(position.x + delta[0], position.y + delta[1], position.z + delta[2]).clamped()
}

/// Move `item` to its best cluster. Returns `true` if membership changed.
fn reassign(clusters: &mut SpatialClusters, repository: &dyn MemoryRepository, item: &MemoryItem) -> bool {
    let current = clusters.cluster_of(&item.id);
    let best = clusters.best_match(&item.id, |other| {
        repository
            .get(other)
            .map(|handle| memory_similarity(item, &handle.read()))
    });
    match (best, current) {
        (Some(found), Some(existing)) if found.cluster == existing => false,
        (Some(found), _) => {
            clusters.assign(&item.id, found.cluster);
            true
        }
        (None, Some(_)) if clusters.cluster_mates(&item.id).is_empty() => false,
        (None, _) => {
            clusters.create_singleton(&item.id);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::store::InMemoryRepository;
    use crate::superposition::{InterferenceMechanism, InterferenceType};
    use crate::types::{HarmonicCategory, HarmonicSignature, MemoryContent};

    fn item(id: &str, at: Coordinates, category: HarmonicCategory, tags: &[&str]) -> MemoryItem {
        MemoryItem::new(
            id,
            at,
            MemoryContent::new(id, HarmonicSignature::new(category, 0.6, 0.4))
                .with_tags(tags.iter().copied()),
        )
    }

    fn outcome(relevance: f64, success: bool) -> ItemOutcome {
        ItemOutcome {
            relevance,
            success,
            query_type: QueryType::Discovery,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_failure_penalty_lands_on_expected_confidence() {
        let mut memory = item("a", Coordinates::CENTER, HarmonicCategory::Wave, &[]);
        memory.confidence_score = 0.95;
        let confidence = ConfidenceEvolutionConfig {
            failure_penalty: 0.2,
            ..ConfidenceEvolutionConfig::default()
        };
        reinforce_item(&mut memory, &HebbianConfig::default(), &confidence, outcome(1.0, false));
        assert!((memory.confidence_score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_never_drops_below_floor() {
        let mut memory = item("a", Coordinates::CENTER, HarmonicCategory::Wave, &[]);
        memory.confidence_score = 0.12;
        let confidence = ConfidenceEvolutionConfig {
            failure_penalty: 1.0,
            uncertainty_decay: 0.5,
            ..ConfidenceEvolutionConfig::default()
        };
        reinforce_item(&mut memory, &HebbianConfig::default(), &confidence, outcome(1.0, false));
        assert!((memory.confidence_score - MIN_CONFIDENCE).abs() < 1e-12);
    }

    #[test]
    fn test_low_confidence_decays_further() {
        let mut memory = item("a", Coordinates::CENTER, HarmonicCategory::Wave, &[]);
        memory.confidence_score = 0.3;
        let confidence = ConfidenceEvolutionConfig::default();
        reinforce_item(&mut memory, &HebbianConfig::default(), &confidence, outcome(0.0, true));
        assert!((memory.confidence_score - 0.3 * 0.98).abs() < 1e-12);
    }

    #[test]
    fn test_hebbian_step_caps_activation_at_threshold() {
        let mut memory = item("a", Coordinates::CENTER, HarmonicCategory::Wave, &[]);
        memory.current_activation = 0.68;
        memory.resonance_strength = 0.95;
        reinforce_item(
            &mut memory,
            &HebbianConfig::default(),
            &ConfidenceEvolutionConfig::default(),
            outcome(1.0, true),
        );
        assert!((memory.current_activation - memory.threshold).abs() < 1e-12);
        assert!((memory.resonance_strength - 1.0).abs() < 1e-12);
        assert_eq!(memory.access_history.len(), 1);
        assert!(memory.access_history[0].success);
    }

    #[test]
    fn test_rank_relevance() {
        assert!((rank_relevance(0, 4) - 1.0).abs() < 1e-12);
        assert!((rank_relevance(2, 4) - 0.5).abs() < 1e-12);
        assert_eq!(rank_relevance(0, 0), 0.0);
    }

    fn seeded() -> (LearningSystem, InMemoryRepository) {
        let learning = LearningSystem::new(&EngineConfig::default());
        let repo = InMemoryRepository::new();
        let items = vec![
            item("a", Coordinates::new(0.2, 0.2, 0.2), HarmonicCategory::Wave, &["sound"]),
            item("b", Coordinates::new(0.22, 0.2, 0.2), HarmonicCategory::Wave, &["sound"]),
            item("c", Coordinates::new(0.9, 0.9, 0.9), HarmonicCategory::Fractal, &["shape"]),
        ];
        learning.batch_integrate(&repo, items).expect("batch integrates");
        (learning, repo)
    }

    #[test]
    fn test_integration_clusters_similar_items() {
        let (learning, repo) = seeded();
        assert_eq!(repo.len(), 3);
        assert_eq!(learning.cluster_count(), 2);
        assert_eq!(learning.cluster_of("a"), learning.cluster_of("b"));
        assert_ne!(learning.cluster_of("a"), learning.cluster_of("c"));
        let stored = repo.get("a").expect("stored");
        assert!((stored.read().confidence_score - INITIAL_SCORE).abs() < 1e-12);
    }

    #[test]
    fn test_batch_mines_associations_between_similar_items() {
        let (learning, _repo) = seeded();
        assert!(learning.associations().strength("a", "b") > BATCH_ASSOCIATION_THRESHOLD);
        assert_eq!(learning.associations().strength("a", "c"), 0.0);
    }

    #[test]
    fn test_invalid_batch_stores_nothing() {
        let learning = LearningSystem::new(&EngineConfig::default());
        let repo = InMemoryRepository::new();
        let items = vec![
            item("ok", Coordinates::CENTER, HarmonicCategory::Wave, &[]),
            item("bad", Coordinates::new(1.5, 0.0, 0.0), HarmonicCategory::Wave, &[]),
        ];
        assert!(matches!(
            learning.batch_integrate(&repo, items),
            Err(QpfmError::Validation { .. })
        ));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_duplicate_store_is_a_validation_error() {
        let (learning, repo) = seeded();
        let again = item("a", Coordinates::CENTER, HarmonicCategory::Wave, &[]);
        assert!(matches!(
            learning.integrate_new_memory(&repo, again),
            Err(QpfmError::Validation { .. })
        ));
    }

    #[test]
    fn test_interaction_strengthens_pairs_and_doubles_pattern_bonus() {
        let (learning, repo) = seeded();
        let query = MemoryQuery::discovery();
        let returned = vec!["a".to_string(), "c".to_string()];
        let pattern = InterferencePattern {
            pattern_type: InterferenceType::Constructive,
            strength: 0.8,
            mechanism: InterferenceMechanism::PhaseCoherence,
            emergent_properties: BTreeSet::new(),
            novelty_score: 0.4,
            confidence_level: 0.5,
            involved_memories: returned.clone(),
        };
        let patterns = [pattern];
        learning.process_interaction(
            &repo,
            &Interaction {
                query: &query,
                returned: &returned,
                coherence_level: 0.2,
                patterns: &patterns,
                timestamp: Utc::now(),
            },
        );
        let bonus = HebbianConfig::default().associative_bonus;
        let expected = bonus + 2.0 * bonus;
        assert!((learning.associations().strength("a", "c") - expected).abs() < 1e-12);
        assert!((learning.associations().strength("c", "a") - expected).abs() < 1e-12);

        let history = learning.recent_interactions(10);
        assert_eq!(history.len(), 1);
        assert!(!history[0].success);
    }

    #[test]
    fn test_spatial_step_pulls_items_together_within_limit() {
        let (learning, repo) = seeded();
        let before_a = repo.get("a").expect("a").read().coordinates;
        let before_c = repo.get("c").expect("c").read().coordinates;
        let query = MemoryQuery::discovery();
        let returned = vec!["a".to_string(), "c".to_string()];
        learning.process_interaction(
            &repo,
            &Interaction {
                query: &query,
                returned: &returned,
                coherence_level: 0.9,
                patterns: &[],
                timestamp: Utc::now(),
            },
        );
        let after_a = repo.get("a").expect("a").read().coordinates;
        let after_c = repo.get("c").expect("c").read().coordinates;
        assert!(after_a.distance(&after_c) < before_a.distance(&before_c));
        let flexibility = SpatialAdaptationConfig::default().boundary_flexibility;
        assert!(after_a.distance(&before_a) <= flexibility + 1e-12);
        assert!(after_a.is_within_unit_cube() && after_c.is_within_unit_cube());
    }

    #[test]
    fn test_drift_respects_boundary_flexibility() {
        let moved = drift(
            &Coordinates::new(0.0, 0.0, 0.0),
            &Coordinates::new(1.0, 1.0, 1.0),
            [1.0; 3],
            0.1,
        );
        assert!((moved.distance(&Coordinates::new(0.0, 0.0, 0.0)) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_dimensional_optimization_favours_wide_axes() {
        let spatial = SpatialAdaptationConfig {
            dimensional_optimization: true,
            ..SpatialAdaptationConfig::default()
        };
        let positions = [Coordinates::new(0.0, 0.5, 0.5), Coordinates::new(1.0, 0.5, 0.6)];
        let rates = axis_rates(&spatial, &positions);
        assert!((rates[0] - spatial.clustering_rate).abs() < 1e-12);
        assert_eq!(rates[1], 0.0);
        assert!(rates[2] < rates[0]);
    }

    #[test]
    fn test_history_is_capped() {
        let learning = LearningSystem::new(&EngineConfig::default());
        let repo = InMemoryRepository::new();
        let query = MemoryQuery::precision();
        for _ in 0..INTERACTION_HISTORY_CAPACITY + 5 {
            learning.process_interaction(
                &repo,
                &Interaction {
                    query: &query,
                    returned: &[],
                    coherence_level: 0.0,
                    patterns: &[],
                    timestamp: Utc::now(),
                },
            );
        }
        assert_eq!(
            learning.recent_interactions(usize::MAX).len(),
            INTERACTION_HISTORY_CAPACITY
        );
    }

    #[test]
    fn test_decay_pass_weakens_idle_items_and_associations() {
        let (learning, repo) = seeded();
        let before = learning.associations().strength("a", "b");
        let later = Utc::now() + chrono::Duration::hours(2);
        let report = learning.decay_pass(&repo, later).expect("maintenance runs");
        assert_eq!(report.items_decayed, 3);
        assert!(report.clusters_consistent);
        let weaken = HebbianConfig::default().weaken_rate;
        assert!((learning.associations().strength("a", "b") - before * (1.0 - weaken)).abs() < 1e-12);
        let resonance = repo.get("a").expect("a").read().resonance_strength;
        assert!((resonance - (INITIAL_SCORE - weaken)).abs() < 1e-12);
    }

    #[test]
    fn test_decay_pass_spares_recent_items() {
        let (learning, repo) = seeded();
        let report = learning.decay_pass(&repo, Utc::now()).expect("maintenance runs");
        assert_eq!(report.items_decayed, 0);
    }
}
