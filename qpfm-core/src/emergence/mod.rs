//! Emergent behavior engine.
//!
//! Four mechanisms scan a collapsed [`MemoryState`] for structure that no
//! single query asked for:
//!
//! - **Dream state**: a random walk across loosely similar memories
//! - **Flashback**: cascades seeded by strongly resonant memories
//! - **Déjà vu**: half-relevant, uncertain memories that resemble each other
//! - **Creative synthesis**: strong interference patterns and cross-category bridges
//!
//! Detection works on the immutable snapshots held by the state, so it never
//! takes a memory's write lock. Randomness comes from a seedable RNG.

pub mod deja_vu;
pub mod dream;
pub mod flashback;
pub mod synthesis;

use crate::config::{
    CreativeSynthesisConfig, DejaVuConfig, DreamStateConfig, DreamTrigger, EngineConfig,
    FlashbackConfig,
};
use crate::numeric::mean;
use crate::superposition::{MemoryState, Superposition, SuperpositionEngine, collapse};
use crate::types::{Coordinates, EmergentInsight, MemoryItem};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Resonance forced onto every memory for a manual flashback.
pub const FORCED_RESONANCE: f64 = 0.9;

/// Probability forced onto every memory for a manual déjà vu pass.
pub const FORCED_FAMILIAR_PROBABILITY: f64 = 0.4;

/// One emergent mechanism, for manual triggering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergentMode {
    Dream,
    Flashback,
    DejaVu,
    CreativeSynthesis,
}

impl EmergentMode {
    pub const ALL: [Self; 4] = [Self::Dream, Self::Flashback, Self::DejaVu, Self::CreativeSynthesis];
}

/// Engine activity a detection pass may react to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmergenceContext {
    /// Time since the previous query completed
    pub idle_for: Duration,
    /// Queries completed so far, including the current one
    pub query_count: u64,
}

/// Insights from one detection pass and the pass's overall novelty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmergenceReport {
    /// Insights produced by the pass
    pub insights: Vec<EmergentInsight>,
    /// Overall novelty of the pass, see [`overall_novelty`]
    pub novelty_score: f64,
}

#[derive(Debug)]
pub struct EmergentBehaviorEngine {
    dream: DreamStateConfig,
    flashback: FlashbackConfig,
    deja_vu: DejaVuConfig,
    synthesis: CreativeSynthesisConfig,
    rng: Mutex<StdRng>,
}

impl EmergentBehaviorEngine {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            dream: config.dream_state.clone(),
            flashback: config.flashback_activation.clone(),
            deja_vu: config.deja_vu_exploration.clone(),
            synthesis: config.creative_synthesis.clone(),
            rng: Mutex::new(rng),
        }
    }

    /// Run every enabled mechanism over a collapsed state.
    ///
    /// `min_novelty`, when given, drops insights whose novelty falls below it.
    pub fn detect(
        &self,
        state: &MemoryState,
        context: &EmergenceContext,
        min_novelty: Option<f64>,
    ) -> EmergenceReport {
        let pool = &state.superpositions;
        let mut insights = Vec::new();

        if self.dream.enabled && self.dream_due(context) {
            let mut rng = self.rng.lock();
            insights.extend(dream::dream_insight(pool, &mut *rng));
        }
        if self.flashback.enabled {
            insights.extend(flashback::flashback_insights(pool, &self.flashback));
        }
        if self.deja_vu.enabled {
            insights.extend(deja_vu::deja_vu_insights(pool, &self.deja_vu));
        }
        if self.synthesis.enabled {
            insights.extend(synthesis::pattern_insights(&state.interference_patterns, &self.synthesis));
            insights.extend(synthesis::bridge_insights(pool));
        }

        if let Some(threshold) = min_novelty {
            insights.retain(|insight| insight.novelty_score >= threshold);
        }
        let novelty_score = overall_novelty(&insights, state);
        tracing::debug!(
            insights = insights.len(),
            novelty = novelty_score,
            "emergence detection complete"
        );
        EmergenceReport {
            insights,
            novelty_score,
        }
    }

    /// Whether the configured dream trigger fires for this pass.
    pub fn dream_due(&self, context: &EmergenceContext) -> bool {
        match self.dream.trigger {
            DreamTrigger::Idle => context.idle_for >= self.dream.idle_after(),
            DreamTrigger::Scheduled => {
                let period = scheduled_period(self.dream.frequency);
                context.query_count > 0 && context.query_count % period == 0
            }
            DreamTrigger::Random => self.rng.lock().gen_bool(self.dream.frequency.clamp(0.0, 1.0)),
        }
    }

    /// Run exactly one mechanism over a snapshot, ignoring enable flags and triggers.
    ///
    /// The snapshot is turned into a uniform superposition. Flashback forces
    /// resonance up to at least [`FORCED_RESONANCE`]; déjà vu forces every
    /// probability into the familiar band and confidence under the
    /// uncertainty threshold.
    pub fn trigger_behavior(
        &self,
        mode: EmergentMode,
        snapshot: &[Arc<MemoryItem>],
        superposition: &SuperpositionEngine,
    ) -> EmergenceReport {
        let mut items: Vec<MemoryItem> = snapshot.iter().map(|item| (**item).clone()).collect();
        match mode {
            EmergentMode::Flashback => {
                let forced = FORCED_RESONANCE.max(0.5 * (self.flashback.threshold + 1.0));
                for item in &mut items {
                    item.resonance_strength = item.resonance_strength.max(forced);
                }
            }
            EmergentMode::DejaVu => {
                let ceiling = self.deja_vu.uncertainty_threshold * 0.5;
                for item in &mut items {
                    item.confidence_score = item.confidence_score.min(ceiling);
                }
            }
            EmergentMode::Dream | EmergentMode::CreativeSynthesis => {}
        }

        let mut superpositions = uniform_superposition(items, superposition);
        if mode == EmergentMode::DejaVu {
            for s in &mut superpositions {
                s.probability = FORCED_FAMILIAR_PROBABILITY;
                s.amplitude = FORCED_FAMILIAR_PROBABILITY.sqrt();
            }
        }
        let patterns = superposition.interference(&superpositions);
        let state = collapse(superpositions, patterns);
        let pool = &state.superpositions;

        let insights = match mode {
            EmergentMode::Dream => {
                let mut rng = self.rng.lock();
                dream::dream_insight(pool, &mut *rng).into_iter().collect()
            }
            EmergentMode::Flashback => {
                let config = FlashbackConfig {
                    threshold: self.flashback.threshold.min(FORCED_RESONANCE - f64::EPSILON),
                    ..self.flashback.clone()
                };
                flashback::flashback_insights(pool, &config)
            }
            EmergentMode::DejaVu => deja_vu::deja_vu_insights(pool, &self.deja_vu),
            EmergentMode::CreativeSynthesis => {
                let mut found = synthesis::pattern_insights(&state.interference_patterns, &self.synthesis);
                found.extend(synthesis::bridge_insights(pool));
                found
            }
        };
        let novelty_score = overall_novelty(&insights, &state);
        tracing::debug!(?mode, insights = insights.len(), "manual emergence trigger");
        EmergenceReport {
            insights,
            novelty_score,
        }
    }
}

/// Queries between scheduled dream walks.
fn scheduled_period(frequency: f64) -> u64 {
    if frequency <= 0.0 {
        return u64::MAX;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (1.0 / frequency).round().clamp(1.0, 1e12) as u64
    }
}

/// Every item with equal probability, phased against its own position.
fn uniform_superposition(items: Vec<MemoryItem>, engine: &SuperpositionEngine) -> Vec<Superposition> {
    if items.is_empty() {
        return Vec::new();
    }
    let probability = 1.0 / crate::numeric::usize_to_f64(items.len());
    let phase = engine.phase_function();
    items
        .into_iter()
        .map(|item| {
            let phase = phase.phase(item.signature(), &item.coordinates, &Coordinates::CENTER);
            Superposition {
                memory: Arc::new(item),
                amplitude: probability.sqrt(),
                phase,
                probability,
                activation_energy: 0.0,
            }
        })
        .collect()
}

/// `0.5 * mean insight novelty + 0.3 * mean pattern novelty + 0.2 * (1 - coherence)`.
#[must_use]
pub fn overall_novelty(insights: &[EmergentInsight], state: &MemoryState) -> f64 {
    let insight_novelty: Vec<f64> = insights.iter().map(|i| i.novelty_score).collect();
    let pattern_novelty: Vec<f64> = state.interference_patterns.iter().map(|p| p.novelty_score).collect();
    let incoherence = 1.0 - state.coherence_level.clamp(0.0, 1.0);
    (0.5 * mean(&insight_novelty) + 0.3 * mean(&pattern_novelty) + 0.2 * incoherence).clamp(0.0, 1.0)
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::types::{HarmonicCategory, HarmonicSignature, InsightType, MemoryContent};

    pub(crate) fn superposition(
        id: &str,
        at: Coordinates,
        category: HarmonicCategory,
        tags: &[&str],
        probability: f64,
    ) -> Superposition {
        let item = MemoryItem::new(
            id,
            at,
            MemoryContent::new(id, HarmonicSignature::new(category, 0.7, 0.5))
                .with_tags(tags.iter().copied()),
        );
        Superposition {
            memory: Arc::new(item),
            amplitude: probability.sqrt(),
            phase: 0.0,
            probability,
            activation_energy: 0.0,
        }
    }

    fn seeded_config() -> EngineConfig {
        EngineConfig {
            seed: Some(11),
            ..EngineConfig::default()
        }
    }

    fn cluster(category: HarmonicCategory, n: usize) -> Vec<Arc<MemoryItem>> {
        (0..n)
            .map(|i| {
                Arc::new(MemoryItem::new(
                    format!("{category}-{i}"),
                    Coordinates::new(0.5, 0.5, 0.45 + 0.02 * crate::numeric::usize_to_f64(i)),
                    MemoryContent::new("cluster", HarmonicSignature::new(category, 0.8, 0.5))
                        .with_tags(["cluster"]),
                ))
            })
            .collect()
    }

    #[test]
    fn test_empty_state_has_neutral_novelty() {
        let engine = EmergentBehaviorEngine::new(&seeded_config());
        let report = engine.detect(&MemoryState::empty(), &EmergenceContext::default(), None);
        assert!(report.insights.is_empty());
        assert!((report.novelty_score - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_overall_novelty_formula() {
        let state = MemoryState {
            coherence_level: 0.5,
            ..MemoryState::empty()
        };
        let insights = vec![EmergentInsight::new(InsightType::NovelConnection, "x", Vec::new(), 0.8, 0.5)];
        assert!((overall_novelty(&insights, &state) - (0.5 * 0.8 + 0.2 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_scheduled_trigger_fires_on_period() {
        let mut config = seeded_config();
        config.dream_state.trigger = DreamTrigger::Scheduled;
        config.dream_state.frequency = 0.25;
        let engine = EmergentBehaviorEngine::new(&config);
        let due: Vec<u64> = (0..=8)
            .filter(|&query_count| {
                engine.dream_due(&EmergenceContext {
                    idle_for: Duration::ZERO,
                    query_count,
                })
            })
            .collect();
        assert_eq!(due, vec![4, 8]);
    }

    #[test]
    fn test_idle_trigger() {
        let mut config = seeded_config();
        config.dream_state.trigger = DreamTrigger::Idle;
        let engine = EmergentBehaviorEngine::new(&config);
        let idle = config.dream_state.idle_after();
        assert!(!engine.dream_due(&EmergenceContext { idle_for: Duration::ZERO, query_count: 1 }));
        assert!(engine.dream_due(&EmergenceContext { idle_for: idle, query_count: 1 }));
    }

    #[test]
    fn test_min_novelty_filters_insights() {
        let engine = EmergentBehaviorEngine::new(&seeded_config());
        let pool: Vec<Superposition> = cluster(HarmonicCategory::Wave, 4)
            .into_iter()
            .map(|memory| {
                let mut item = (*memory).clone();
                item.resonance_strength = 0.95;
                Superposition {
                    memory: Arc::new(item),
                    amplitude: 0.5,
                    phase: 0.0,
                    probability: 0.25,
                    activation_energy: 0.0,
                }
            })
            .collect();
        let state = collapse(pool, Vec::new());
        let all = engine.detect(&state, &EmergenceContext::default(), None);
        assert!(!all.insights.is_empty());
        let none = engine.detect(&state, &EmergenceContext::default(), Some(1.1));
        assert!(none.insights.is_empty());
    }

    #[test]
    fn test_forced_flashback_finds_cascade() {
        let engine = EmergentBehaviorEngine::new(&seeded_config());
        let report = engine.trigger_behavior(
            EmergentMode::Flashback,
            &cluster(HarmonicCategory::Wave, 4),
            &SuperpositionEngine::new(),
        );
        assert_eq!(report.insights.len(), 1);
        assert_eq!(report.insights[0].insight_type, InsightType::PatternSynthesis);
    }

    #[test]
    fn test_forced_deja_vu_groups_snapshot() {
        let engine = EmergentBehaviorEngine::new(&seeded_config());
        let report = engine.trigger_behavior(
            EmergentMode::DejaVu,
            &cluster(HarmonicCategory::Topological, 3),
            &SuperpositionEngine::new(),
        );
        assert_eq!(report.insights.len(), 1);
        assert_eq!(report.insights[0].insight_type, InsightType::UnexpectedRelevance);
    }

    #[test]
    fn test_forced_dream_walks_connected_snapshot() {
        let engine = EmergentBehaviorEngine::new(&seeded_config());
        let report = engine.trigger_behavior(
            EmergentMode::Dream,
            &cluster(HarmonicCategory::Fractal, 5),
            &SuperpositionEngine::new(),
        );
        assert_eq!(report.insights.len(), 1);
        assert_eq!(report.insights[0].insight_type, InsightType::NovelConnection);
    }

    #[test]
    fn test_forced_synthesis_bridges_categories() {
        let engine = EmergentBehaviorEngine::new(&seeded_config());
        let mut snapshot = cluster(HarmonicCategory::Wave, 2);
        snapshot.extend(cluster(HarmonicCategory::Geometric, 2));
        let report = engine.trigger_behavior(
            EmergentMode::CreativeSynthesis,
            &snapshot,
            &SuperpositionEngine::new(),
        );
        assert!(
            report
                .insights
                .iter()
                .any(|insight| insight.description.contains("bridge"))
        );
    }

    #[test]
    fn test_empty_snapshot_triggers_nothing() {
        let engine = EmergentBehaviorEngine::new(&seeded_config());
        for mode in EmergentMode::ALL {
            let report = engine.trigger_behavior(mode, &[], &SuperpositionEngine::new());
            assert!(report.insights.is_empty(), "{mode:?}");
        }
    }
}
