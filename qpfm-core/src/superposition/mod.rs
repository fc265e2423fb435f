//! Superposition engine.
//!
//! Turns a probability field and a candidate list into a normalized,
//! phase-tagged superposition, then finds the dominant states, the
//! interference patterns, and a coherence score for the whole set.
//!
//! All functions here are pure over read-only snapshots of the candidates,
//! so overlapping queries can score concurrently without coordination.

pub mod interference;

pub use interference::{
    FREQUENCY_RATIOS, InterferenceDetector, InterferenceMechanism, InterferencePattern,
    InterferenceType,
};

use crate::field::{FieldShapeFunction, HarmonicPhase, PhaseFunction, ProbabilityField, StandardFalloff};
use crate::numeric::{floored, mean, variance};
use crate::types::{Coordinates, MemoryId, MemoryItem};
use std::sync::Arc;

/// Candidates weighted below this are dropped before normalization.
pub const MIN_CANDIDATE_PROBABILITY: f64 = 0.0001;

/// Absolute floor of the dominance cutoff.
pub const DOMINANCE_FLOOR: f64 = 0.1;

/// Fraction of the strongest probability a state needs to count as dominant.
pub const DOMINANCE_RATIO: f64 = 0.3;

/// One candidate's score within a query.
#[derive(Debug, Clone)]
pub struct Superposition {
    /// Snapshot of the scored item
    pub memory: Arc<MemoryItem>,
    /// Always `sqrt(probability)`
    pub amplitude: f64,
    /// Phase in `[0, 2π)`
    pub phase: f64,
    /// Normalized share of the field, in `[0,1]`
    pub probability: f64,
    /// Remaining energy needed to fire the item; zero means it fires
    pub activation_energy: f64,
}

impl Superposition {
    #[must_use]
    pub fn id(&self) -> &MemoryId {
        &self.memory.id
    }
}

/// Full result of superposing a field over candidates.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    /// Every scored candidate, in scoring order
    pub superpositions: Vec<Superposition>,
    /// 1.0 after normalization, 0.0 when empty
    pub total_probability: f64,
    /// Dominant subset, strongest first
    pub dominant_states: Vec<Superposition>,
    /// Groupings found among the dominant states
    pub interference_patterns: Vec<InterferencePattern>,
    /// How concentrated the probability mass is, in `[0,1]`
    pub coherence_level: f64,
}

impl MemoryState {
    /// The zero-coherence state returned for empty candidate sets.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.superpositions.is_empty()
    }

    /// Find the superposition of a given memory.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Superposition> {
        self.superpositions.iter().find(|s| s.memory.id == id)
    }
}

/// Scores candidates against a field using pluggable falloff and phase strategies.
#[derive(Debug, Clone)]
pub struct SuperpositionEngine {
    shape: Arc<dyn FieldShapeFunction>,
    phase: Arc<dyn PhaseFunction>,
    detector: InterferenceDetector,
}

impl Default for SuperpositionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SuperpositionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_strategies(Arc::new(StandardFalloff), Arc::new(HarmonicPhase::default()))
    }

    #[must_use]
    pub fn with_strategies(shape: Arc<dyn FieldShapeFunction>, phase: Arc<dyn PhaseFunction>) -> Self {
        Self {
            shape,
            phase,
            detector: InterferenceDetector::default(),
        }
    }

    #[must_use]
    pub fn with_detector(mut self, detector: InterferenceDetector) -> Self {
        self.detector = detector;
        self
    }

    #[must_use]
    pub fn phase_function(&self) -> &dyn PhaseFunction {
        self.phase.as_ref()
    }

    #[must_use]
    pub const fn detector(&self) -> &InterferenceDetector {
        &self.detector
    }

    /// Superpose, collapse, and detect interference in one call.
    #[must_use]
    pub fn create_superposition(
        &self,
        field: &ProbabilityField,
        candidates: &[Arc<MemoryItem>],
    ) -> MemoryState {
        let superpositions = self.superpose(field, candidates);
        let patterns = self.detector.detect(&superpositions);
        collapse(superpositions, patterns)
    }

    /// Score, phase-tag, and normalize the candidates.
    #[must_use]
    pub fn superpose(
        &self,
        field: &ProbabilityField,
        candidates: &[Arc<MemoryItem>],
    ) -> Vec<Superposition> {
        let mut superpositions: Vec<Superposition> = candidates
            .iter()
            .filter_map(|item| {
                let probability = self.shape.probability(&item.coordinates, field);
                if probability < MIN_CANDIDATE_PROBABILITY {
                    return None;
                }
                let amplitude = probability.sqrt();
                let phase = self
                    .phase
                    .phase(item.signature(), &item.coordinates, &field.center);
                Some(Superposition {
                    memory: Arc::clone(item),
                    amplitude,
                    phase,
                    probability,
                    activation_energy: activation_energy(item, field),
                })
            })
            .collect();
        normalize(&mut superpositions);
        tracing::debug!(
            candidates = candidates.len(),
            retained = superpositions.len(),
            "superposition scored"
        );
        superpositions
    }

    /// Run interference detection over a scored superposition.
    #[must_use]
    pub fn interference(&self, superpositions: &[Superposition]) -> Vec<InterferencePattern> {
        self.detector.detect(superpositions)
    }
}

/// Energy still needed before an item fires under a field.
#[must_use]
pub fn activation_energy(item: &MemoryItem, field: &ProbabilityField) -> f64 {
    let amplitude_boost = field.amplitude * 0.3;
    let confidence_modifier = item.confidence_score * 0.2;
    (item.threshold - item.current_activation - amplitude_boost - confidence_modifier).max(0.0)
}

/// Scale probabilities to sum to one and recompute amplitudes.
///
/// Leaves an empty slice, or one whose mass is zero, untouched.
pub fn normalize(superpositions: &mut [Superposition]) {
    let total: f64 = superpositions.iter().map(|s| s.probability).sum();
    if total <= 0.0 || !total.is_finite() {
        return;
    }
    for superposition in superpositions.iter_mut() {
        superposition.probability /= total;
        superposition.amplitude = superposition.probability.sqrt();
    }
}

/// Probability a state needs to be dominant given the strongest probability.
#[must_use]
pub fn dominance_cutoff(max_probability: f64) -> f64 {
    DOMINANCE_FLOOR.max(DOMINANCE_RATIO * max_probability)
}

/// States at or above the dominance cutoff, strongest first.
#[must_use]
pub fn dominant_states(superpositions: &[Superposition]) -> Vec<Superposition> {
    let max_probability = superpositions
        .iter()
        .map(|s| s.probability)
        .fold(0.0_f64, f64::max);
    let cutoff = dominance_cutoff(max_probability);
    let mut dominant: Vec<Superposition> = superpositions
        .iter()
        .filter(|s| s.probability >= cutoff)
        .cloned()
        .collect();
    dominant.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    dominant
}

/// Weighted agreement of phase, amplitude, and spatial layout.
///
/// `0.4 * phase + 0.3 * amplitude + 0.3 * spatial`, zero for an empty set.
#[must_use]
pub fn coherence_level(superpositions: &[Superposition]) -> f64 {
    if superpositions.is_empty() {
        return 0.0;
    }
    let phases: Vec<f64> = superpositions.iter().map(|s| s.phase).collect();
    let phase_coherence = 1.0 / (1.0 + variance(&phases));

    let (min_amplitude, max_amplitude) = superpositions.iter().fold(
        (f64::INFINITY, 0.0_f64),
        |(lo, hi), s| (lo.min(s.amplitude), hi.max(s.amplitude)),
    );
    let amplitude_coherence = (min_amplitude / floored(max_amplitude, f64::EPSILON)).clamp(0.0, 1.0);

    let points: Vec<Coordinates> = superpositions.iter().map(|s| s.memory.coordinates).collect();
    let spatial_coherence = Coordinates::centroid(&points).map_or(0.0, |centroid| {
        let distances: Vec<f64> = points.iter().map(|p| p.distance(&centroid)).collect();
        (-2.0 * mean(&distances)).exp()
    });

    (0.4 * phase_coherence + 0.3 * amplitude_coherence + 0.3 * spatial_coherence).clamp(0.0, 1.0)
}

/// Assemble a [`MemoryState`] from normalized superpositions and detected patterns.
#[must_use]
pub fn collapse(superpositions: Vec<Superposition>, patterns: Vec<InterferencePattern>) -> MemoryState {
    if superpositions.is_empty() {
        return MemoryState::empty();
    }
    let total_probability = superpositions.iter().map(|s| s.probability).sum();
    let dominant_states = dominant_states(&superpositions);
    let coherence_level = coherence_level(&superpositions);
    MemoryState {
        superpositions,
        total_probability,
        dominant_states,
        interference_patterns: patterns,
        coherence_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HarmonicCategory, HarmonicSignature, MemoryContent};

    fn item(id: &str, coordinates: Coordinates) -> Arc<MemoryItem> {
        Arc::new(MemoryItem::new(
            id,
            coordinates,
            MemoryContent::new(id, HarmonicSignature::new(HarmonicCategory::Structural, 0.6, 0.4)),
        ))
    }

    fn with_probability(id: &str, probability: f64) -> Superposition {
        Superposition {
            memory: item(id, Coordinates::CENTER),
            amplitude: probability.sqrt(),
            phase: 0.0,
            probability,
            activation_energy: 0.0,
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let engine = SuperpositionEngine::new();
        let field = ProbabilityField::new(Coordinates::CENTER, 0.4);
        let candidates = vec![
            item("a", Coordinates::new(0.5, 0.5, 0.5)),
            item("b", Coordinates::new(0.6, 0.5, 0.5)),
            item("c", Coordinates::new(0.7, 0.6, 0.5)),
        ];
        let state = engine.create_superposition(&field, &candidates);
        let total: f64 = state.superpositions.iter().map(|s| s.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((state.total_probability - 1.0).abs() < 1e-9);
        for s in &state.superpositions {
            assert!((s.amplitude * s.amplitude - s.probability).abs() < 1e-12);
            assert!((0.0..std::f64::consts::TAU).contains(&s.phase));
        }
    }

    #[test]
    fn test_distant_candidates_are_discarded() {
        let engine = SuperpositionEngine::new();
        let mut field = ProbabilityField::new(Coordinates::new(0.0, 0.0, 0.0), 0.05);
        field.gradient_steepness = 4.0;
        let candidates = vec![
            item("near", Coordinates::new(0.0, 0.0, 0.0)),
            item("far", Coordinates::new(1.0, 1.0, 1.0)),
        ];
        let superpositions = engine.superpose(&field, &candidates);
        assert_eq!(superpositions.len(), 1);
        assert_eq!(superpositions[0].memory.id, "near");
    }

    #[test]
    fn test_dominance_threshold() {
        let sups = vec![
            with_probability("a", 0.6),
            with_probability("b", 0.3),
            with_probability("c", 0.1),
        ];
        let dominant = dominant_states(&sups);
        let ids: Vec<&str> = dominant.iter().map(|s| s.memory.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!((dominance_cutoff(0.6) - 0.18).abs() < 1e-12);
        assert!((dominance_cutoff(0.2) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_empty_candidates_yield_zero_coherence() {
        let engine = SuperpositionEngine::new();
        let state = engine.create_superposition(&ProbabilityField::new(Coordinates::CENTER, 0.3), &[]);
        assert!(state.is_empty());
        assert_eq!(state.coherence_level, 0.0);
        assert_eq!(state.total_probability, 0.0);
        assert!(state.interference_patterns.is_empty());
    }

    #[test]
    fn test_single_candidate_is_certain_and_coherent() {
        let engine = SuperpositionEngine::new();
        let point = Coordinates::new(0.3, 0.7, 0.2);
        let state = engine.create_superposition(&ProbabilityField::new(point, 0.1), &[item("solo", point)]);
        assert_eq!(state.dominant_states.len(), 1);
        assert!((state.dominant_states[0].probability - 1.0).abs() < 1e-12);
        assert!((state.coherence_level - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_activation_energy_is_never_negative() {
        let field = ProbabilityField::new(Coordinates::CENTER, 0.3);
        let mut memory = (*item("a", Coordinates::CENTER)).clone();
        memory.current_activation = 0.1;
        memory.confidence_score = 0.5;
        // 0.7 - 0.1 - 0.3 - 0.1
        assert!((activation_energy(&memory, &field) - 0.2).abs() < 1e-12);
        memory.current_activation = 0.7;
        assert_eq!(activation_energy(&memory, &field), 0.0);
    }
}
