//! Engine configuration.
//!
//! Every section deserializes with `#[serde(default)]` so a TOML file only
//! needs to mention the knobs it changes. `config/default.toml` lists all of
//! them with their default values.

use crate::error::{QpfmError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for [`QuantumMemoryEngine`](crate::QuantumMemoryEngine).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Access and co-occurrence rewards
    pub hebbian_strengthening: HebbianConfig,
    /// Confidence reward and penalty
    pub confidence_evolution: ConfidenceEvolutionConfig,
    /// Drift of co-retrieved items
    pub spatial_adaptation: SpatialAdaptationConfig,
    /// Random-walk insight generation
    pub dream_state: DreamStateConfig,
    /// Resonance cascades
    pub flashback_activation: FlashbackConfig,
    /// Uncertainty-driven exploration
    pub deja_vu_exploration: DejaVuConfig,
    /// Cross-category synthesis
    pub creative_synthesis: CreativeSynthesisConfig,
    /// Advisory timing and hit-rate targets
    pub performance_targets: PerformanceTargets,
    /// Field radii and result size
    pub field: FieldConfig,
    /// How insights reach the caller
    pub insight_delivery: InsightDelivery,
    /// Seed for dream walks and forced triggers; `None` draws from entropy
    pub seed: Option<u64>,
}

impl EngineConfig {
    /// Parse a TOML document and validate the result.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)
            .map_err(|e| QpfmError::configuration(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| {
            QpfmError::configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&document)
    }

    /// Reject values that would break the learning or emergence math.
    pub fn validate(&self) -> Result<()> {
        let unit_rates = [
            ("hebbian_strengthening.strengthen_rate", self.hebbian_strengthening.strengthen_rate),
            ("hebbian_strengthening.weaken_rate", self.hebbian_strengthening.weaken_rate),
            ("hebbian_strengthening.associative_bonus", self.hebbian_strengthening.associative_bonus),
            ("confidence_evolution.success_bonus", self.confidence_evolution.success_bonus),
            ("confidence_evolution.failure_penalty", self.confidence_evolution.failure_penalty),
            ("confidence_evolution.uncertainty_decay", self.confidence_evolution.uncertainty_decay),
            ("spatial_adaptation.clustering_rate", self.spatial_adaptation.clustering_rate),
            ("spatial_adaptation.boundary_flexibility", self.spatial_adaptation.boundary_flexibility),
            ("dream_state.frequency", self.dream_state.frequency),
            ("flashback_activation.threshold", self.flashback_activation.threshold),
            ("deja_vu_exploration.uncertainty_threshold", self.deja_vu_exploration.uncertainty_threshold),
            ("creative_synthesis.novelty_threshold", self.creative_synthesis.novelty_threshold),
        ];
        for (name, value) in unit_rates {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(QpfmError::configuration(format!(
                    "{name} must lie in [0,1], got {value}"
                )));
            }
        }
        if self.flashback_activation.cascade_depth == 0 {
            return Err(QpfmError::configuration(
                "flashback_activation.cascade_depth must be at least 1",
            ));
        }
        if self.performance_targets.query_deadline_ms == 0 {
            return Err(QpfmError::configuration(
                "performance_targets.query_deadline_ms must be positive",
            ));
        }
        if self.deja_vu_exploration.expansion_factor <= 0.0 {
            return Err(QpfmError::configuration(
                "deja_vu_exploration.expansion_factor must be positive",
            ));
        }
        for (name, radius) in [
            ("field.precision_radius", self.field.precision_radius),
            ("field.discovery_radius", self.field.discovery_radius),
            ("field.creative_radius", self.field.creative_radius),
        ] {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(QpfmError::configuration(format!(
                    "{name} must be a positive radius, got {radius}"
                )));
            }
        }
        Ok(())
    }
}

/// Reward magnitudes for access and co-occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HebbianConfig {
    /// Resonance gained per relevant access
    pub strengthen_rate: f64,
    /// Applied by the maintenance pass to associations and idle resonance
    pub weaken_rate: f64,
    /// Association gained per co-retrieved pair
    pub associative_bonus: f64,
    /// Items not accessed for this long lose resonance during maintenance
    pub idle_window_secs: u64,
}

impl Default for HebbianConfig {
    fn default() -> Self {
        Self {
            strengthen_rate: 0.1,
            weaken_rate: 0.05,
            associative_bonus: 0.05,
            idle_window_secs: 3_600,
        }
    }
}

impl HebbianConfig {
    #[must_use]
    pub const fn idle_window(&self) -> Duration {
        Duration::from_secs(self.idle_window_secs)
    }
}

/// Reward and penalty magnitudes for confidence evolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceEvolutionConfig {
    /// Confidence gained by a successful retrieval
    pub success_bonus: f64,
    /// Confidence lost by an unsuccessful retrieval
    pub failure_penalty: f64,
    /// Extra multiplicative decay for items below 0.4 confidence
    pub uncertainty_decay: f64,
}

impl Default for ConfidenceEvolutionConfig {
    fn default() -> Self {
        Self {
            success_bonus: 0.05,
            failure_penalty: 0.03,
            uncertainty_decay: 0.02,
        }
    }
}

/// Controls drift of co-retrieved items toward each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialAdaptationConfig {
    /// Disable to keep coordinates fixed
    pub enabled: bool,
    /// Fraction of the distance to the result centroid moved per query
    pub clustering_rate: f64,
    /// Largest displacement a single learning step may apply
    pub boundary_flexibility: f64,
    /// Scale drift per axis by the result set's spread along that axis
    pub dimensional_optimization: bool,
}

impl Default for SpatialAdaptationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clustering_rate: 0.05,
            boundary_flexibility: 0.1,
            dimensional_optimization: false,
        }
    }
}

/// Condition that starts a dream walk during a detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DreamTrigger {
    /// Run once the engine has been idle for `idle_after_secs`
    Idle,
    /// Run every `round(1 / frequency)` queries
    Scheduled,
    /// Run with probability `frequency` per pass
    #[default]
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DreamStateConfig {
    /// Disable to skip dream walks entirely
    pub enabled: bool,
    /// What starts a walk
    pub trigger: DreamTrigger,
    /// Walk probability or period, depending on `trigger`
    pub frequency: f64,
    /// Idle time required by [`DreamTrigger::Idle`]
    pub idle_after_secs: u64,
}

impl Default for DreamStateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger: DreamTrigger::Random,
            frequency: 0.1,
            idle_after_secs: 300,
        }
    }
}

impl DreamStateConfig {
    #[must_use]
    pub const fn idle_after(&self) -> Duration {
        Duration::from_secs(self.idle_after_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashbackConfig {
    /// Disable to skip cascade tracing
    pub enabled: bool,
    /// Minimum resonance for an item to seed a cascade
    pub threshold: f64,
    /// Maximum breadth-first levels below the seed
    pub cascade_depth: usize,
}

impl Default for FlashbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.8,
            cascade_depth: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DejaVuConfig {
    /// Disable to skip uncertainty exploration
    pub enabled: bool,
    /// Items below this confidence count as uncertain
    pub uncertainty_threshold: f64,
    /// Scales how far the suggested follow-up search should widen
    pub expansion_factor: f64,
}

impl Default for DejaVuConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            uncertainty_threshold: 0.4,
            expansion_factor: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreativeSynthesisConfig {
    /// Disable to skip pattern synthesis
    pub enabled: bool,
    /// Minimum number of memories a pattern must involve
    pub minimum_patterns: usize,
    /// Minimum pattern novelty worth reporting
    pub novelty_threshold: f64,
}

impl Default for CreativeSynthesisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_patterns: 2,
            novelty_threshold: 0.3,
        }
    }
}

/// Advisory service levels; only `query_deadline_ms` affects control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceTargets {
    /// Queries slower than this are logged and counted as overruns
    pub max_query_time_ms: u64,
    /// Deadline at zero urgency; urgency 1.0 shrinks it to a quarter
    pub query_deadline_ms: u64,
    /// Reported alongside the measured hit rate
    pub target_hit_rate: f64,
    /// Reported alongside the measured emergence frequency
    pub target_emergence_frequency: f64,
}

impl Default for PerformanceTargets {
    fn default() -> Self {
        Self {
            max_query_time_ms: 100,
            query_deadline_ms: 5_000,
            target_hit_rate: 0.8,
            target_emergence_frequency: 0.2,
        }
    }
}

impl PerformanceTargets {
    /// Deadline for a query of the given urgency; a non-finite urgency gets the full budget.
    #[must_use]
    pub fn deadline_for(&self, urgency: Option<f64>) -> Duration {
        let urgency = urgency.filter(|u| u.is_finite()).unwrap_or(0.0).clamp(0.0, 1.0);
        let millis = crate::numeric::u64_to_f64(self.query_deadline_ms) * (1.0 - 0.75 * urgency);
        Duration::from_secs_f64(millis.max(1.0) / 1000.0)
    }
}

/// Base radii per query type and default result size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Base radius for precision queries
    pub precision_radius: f64,
    /// Base radius for discovery queries
    pub discovery_radius: f64,
    /// Base radius for creative queries
    pub creative_radius: f64,
    /// Result cap when a query leaves `max_results` unset
    pub default_max_results: usize,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            precision_radius: 0.15,
            discovery_radius: 0.35,
            creative_radius: 0.5,
            default_max_results: 10,
        }
    }
}

/// When emergent insights are produced relative to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightDelivery {
    /// Detect after learning and attach to the query result
    #[default]
    Inline,
    /// Detect on a background thread; drain with `take_deferred_insights`
    Deferred,
    Disabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_matches_default_config() {
        let parsed = EngineConfig::from_toml_str(include_str!("../config/default.toml"));
        assert_eq!(parsed.ok(), Some(EngineConfig::default()));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            "[hebbian_strengthening]\nassociative_bonus = 0.2\n\n[dream_state]\ntrigger = \"scheduled\"\n",
        )
        .unwrap_or_default();
        assert!((config.hebbian_strengthening.associative_bonus - 0.2).abs() < 1e-12);
        assert!((config.hebbian_strengthening.strengthen_rate - 0.1).abs() < 1e-12);
        assert_eq!(config.dream_state.trigger, DreamTrigger::Scheduled);
    }

    #[test]
    fn test_out_of_range_rates_are_rejected() {
        let result = EngineConfig::from_toml_str("[confidence_evolution]\nfailure_penalty = 1.5\n");
        assert!(matches!(result, Err(QpfmError::Configuration { .. })));

        let result = EngineConfig::from_toml_str("[flashback_activation]\ncascade_depth = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_urgency_shrinks_deadline() {
        let targets = PerformanceTargets::default();
        assert_eq!(targets.deadline_for(None), Duration::from_secs(5));
        assert_eq!(targets.deadline_for(Some(1.0)), Duration::from_millis(1_250));
    }

    #[test]
    fn test_non_finite_urgency_gets_full_budget() {
        let targets = PerformanceTargets::default();
        assert_eq!(targets.deadline_for(Some(f64::NAN)), Duration::from_secs(5));
        assert_eq!(targets.deadline_for(Some(f64::INFINITY)), Duration::from_secs(5));
    }
}
