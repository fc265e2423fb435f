//! Interference detection over a scored superposition.
//!
//! Three independent mechanisms look for emergent groupings:
//!
//! - **Phase coherence**: items whose phases fall in the same `π/3` bin
//! - **Harmonic resonance**: items sharing a harmonic category with strong signatures
//! - **Frequency matching**: pairs whose access rhythms lock at simple ratios
//!
//! Every mechanism runs over the full superposition, not just the dominant
//! states, and the combined output is ordered by strength.

use super::Superposition;
use crate::numeric::{floored, mean, std_dev, usize_to_f64};
use crate::types::{Coordinates, HarmonicCategory, MemoryId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::f64::consts::{FRAC_PI_3, FRAC_PI_4};

/// Frequency ratios treated as harmonic locks, with their property names.
pub const FREQUENCY_RATIOS: [(f64, &str); 4] = [
    (1.0, "unison"),
    (0.5, "octave"),
    (0.667, "perfect_fifth"),
    (0.75, "perfect_fourth"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterferenceType {
    Constructive,
    Destructive,
}

/// Which detector produced a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterferenceMechanism {
    PhaseCoherence,
    HarmonicResonance,
    FrequencyMatching,
}

/// An emergent grouping of memories found in a superposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterferencePattern {
    /// How the involved memories combine
    pub pattern_type: InterferenceType,
    /// Combined strength in `[0,1]`
    pub strength: f64,
    /// Which signal produced the grouping
    pub mechanism: InterferenceMechanism,
    /// Labels describing what the grouping shares
    pub emergent_properties: BTreeSet<String>,
    /// Novelty relative to the memories' familiarity, in `[0,1]`
    pub novelty_score: f64,
    /// Detector confidence in `[0,1]`
    pub confidence_level: f64,
    /// Members of the grouping, in detection order
    pub involved_memories: Vec<MemoryId>,
}

impl InterferencePattern {
    /// Every unordered pair of involved memories.
    pub fn member_pairs(&self) -> impl Iterator<Item = (&MemoryId, &MemoryId)> {
        self.involved_memories.iter().enumerate().flat_map(move |(i, a)| {
            self.involved_memories[i + 1..].iter().map(move |b| (a, b))
        })
    }
}

/// Thresholds for the three detection mechanisms.
#[derive(Debug, Clone)]
pub struct InterferenceDetector {
    /// Width of a phase bin in radians
    pub phase_bin_width: f64,
    /// Summed amplitude a phase bin must exceed
    pub min_bin_amplitude: f64,
    /// Mean signature strength a category group must exceed
    pub min_resonance_strength: f64,
    /// Allowed deviation from a harmonic frequency ratio
    pub frequency_tolerance: f64,
    /// Amplitude product a frequency-locked pair must exceed
    pub min_amplitude_product: f64,
}

impl Default for InterferenceDetector {
    fn default() -> Self {
        Self {
            phase_bin_width: FRAC_PI_3,
            min_bin_amplitude: 0.2,
            min_resonance_strength: 0.3,
            frequency_tolerance: 0.05,
            min_amplitude_product: 0.2,
        }
    }
}

impl InterferenceDetector {
    /// Run all mechanisms and order the patterns by descending strength.
    #[must_use]
    pub fn detect(&self, superpositions: &[Superposition]) -> Vec<InterferencePattern> {
        let mut patterns = self.phase_coherence(superpositions);
        patterns.extend(self.harmonic_resonance(superpositions));
        patterns.extend(self.frequency_matching(superpositions));
        patterns.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        patterns
    }

    /// Bin items by phase; bins with two or more members and enough amplitude interfere.
    #[must_use]
    pub fn phase_coherence(&self, superpositions: &[Superposition]) -> Vec<InterferencePattern> {
        let width = floored(self.phase_bin_width, 1e-9);
        let mut bins: BTreeMap<u64, Vec<&Superposition>> = BTreeMap::new();
        for superposition in superpositions {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bin = (superposition.phase / width).floor().max(0.0) as u64;
            bins.entry(bin).or_default().push(superposition);
        }

        bins.into_values()
            .filter(|members| members.len() >= 2)
            .filter_map(|members| {
                let strength: f64 = members.iter().map(|s| s.amplitude).sum();
                if strength <= self.min_bin_amplitude {
                    return None;
                }
                let mut properties = shared_tags(&members);
                let phases: Vec<f64> = members.iter().map(|s| s.phase).collect();
                if std_dev(&phases) < FRAC_PI_4 {
                    properties.insert("phase_aligned".to_string());
                }
                let confidences = confidences(&members);
                if std_dev(&confidences) < 0.1 {
                    properties.insert("confidence_consensus".to_string());
                }
                Some(InterferencePattern {
                    pattern_type: InterferenceType::Constructive,
                    strength,
                    mechanism: InterferenceMechanism::PhaseCoherence,
                    emergent_properties: properties,
                    novelty_score: group_novelty(&members),
                    confidence_level: group_confidence(&confidences),
                    involved_memories: ids(&members),
                })
            })
            .collect()
    }

    /// Group items by harmonic category; strong groups resonate.
    #[must_use]
    pub fn harmonic_resonance(&self, superpositions: &[Superposition]) -> Vec<InterferencePattern> {
        let mut groups: BTreeMap<HarmonicCategory, Vec<&Superposition>> = BTreeMap::new();
        for superposition in superpositions {
            groups
                .entry(superposition.memory.category())
                .or_default()
                .push(superposition);
        }

        groups
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .filter_map(|(category, members)| {
                let strengths: Vec<f64> = members
                    .iter()
                    .map(|s| s.memory.signature().strength)
                    .collect();
                let mean_strength = mean(&strengths);
                if mean_strength <= self.min_resonance_strength {
                    return None;
                }
                let mut properties = shared_tags(&members);
                properties.insert(format!("harmonic_{category}"));
                Some(InterferencePattern {
                    pattern_type: InterferenceType::Constructive,
                    strength: mean_strength * usize_to_f64(members.len()) / 10.0,
                    mechanism: InterferenceMechanism::HarmonicResonance,
                    emergent_properties: properties,
                    novelty_score: group_novelty(&members),
                    confidence_level: group_confidence(&confidences(&members)),
                    involved_memories: ids(&members),
                })
            })
            .collect()
    }

    /// Pairs whose access frequencies lock at a harmonic ratio.
    #[must_use]
    pub fn frequency_matching(&self, superpositions: &[Superposition]) -> Vec<InterferencePattern> {
        let frequencies: Vec<Option<f64>> = superpositions
            .iter()
            .map(|s| s.memory.activation_frequency())
            .collect();

        let mut patterns = Vec::new();
        for (i, first) in superpositions.iter().enumerate() {
            let Some(freq_a) = frequencies[i] else {
                continue;
            };
            for (j, second) in superpositions.iter().enumerate().skip(i + 1) {
                let Some(freq_b) = frequencies[j] else {
                    continue;
                };
                let amplitude_product = first.amplitude * second.amplitude;
                if amplitude_product <= self.min_amplitude_product {
                    continue;
                }
                let ratio = freq_a.min(freq_b) / floored(freq_a.max(freq_b), f64::EPSILON);
                let Some((_, name)) = FREQUENCY_RATIOS
                    .iter()
                    .find(|(target, _)| (ratio - target).abs() <= self.frequency_tolerance)
                else {
                    continue;
                };
                let members = [first, second];
                let mut properties = shared_tags(&members);
                properties.insert("frequency_locked".to_string());
                properties.insert((*name).to_string());
                patterns.push(InterferencePattern {
                    pattern_type: InterferenceType::Constructive,
                    strength: amplitude_product,
                    mechanism: InterferenceMechanism::FrequencyMatching,
                    emergent_properties: properties,
                    novelty_score: group_novelty(&members),
                    confidence_level: group_confidence(&confidences(&members)),
                    involved_memories: ids(&members),
                });
            }
        }
        patterns
    }
}

fn ids(members: &[&Superposition]) -> Vec<MemoryId> {
    members.iter().map(|s| s.memory.id.clone()).collect()
}

fn confidences(members: &[&Superposition]) -> Vec<f64> {
    members.iter().map(|s| s.memory.confidence_score).collect()
}

/// Tags carried by at least half of the members.
fn shared_tags(members: &[&Superposition]) -> BTreeSet<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for member in members {
        for tag in &member.memory.content.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| count * 2 >= members.len())
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// Mix of category diversity, spatial extent, and temporal spread.
pub(crate) fn group_novelty(members: &[&Superposition]) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    let categories: BTreeSet<HarmonicCategory> =
        members.iter().map(|s| s.memory.category()).collect();
    let diversity = usize_to_f64(categories.len()) / usize_to_f64(members.len());

    let points: Vec<Coordinates> = members.iter().map(|s| s.memory.coordinates).collect();
    let spatial = Coordinates::bounding_volume(&points).cbrt().clamp(0.0, 1.0);

    let timestamps = members.iter().map(|s| s.memory.last_evolution);
    let temporal = match (timestamps.clone().min(), timestamps.max()) {
        (Some(earliest), Some(latest)) => {
            let hours = crate::numeric::i64_to_f64((latest - earliest).num_seconds()) / 3600.0;
            (hours / 24.0).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };

    (0.4 * diversity + 0.3 * spatial + 0.3 * temporal).clamp(0.0, 1.0)
}

/// Mean confidence penalised by its spread, the penalty capped at 0.3.
pub(crate) fn group_confidence(confidences: &[f64]) -> f64 {
    (mean(confidences) - std_dev(confidences).min(0.3)).clamp(0.0, 1.0)
}
