//! Flashback cascades: strongly resonant memories pulling in their close neighbours.

use crate::config::FlashbackConfig;
use crate::numeric::{mean, usize_to_f64};
use crate::similarity::memory_similarity;
use crate::superposition::Superposition;
use crate::types::{EmergentInsight, InsightType, MemoryId};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Similarity a neighbour needs to join a cascade.
pub const CASCADE_SIMILARITY: f64 = 0.7;

/// Resonance a neighbour needs to join a cascade.
pub const CASCADE_RESONANCE: f64 = 0.6;

/// Shortest cascade that is reported.
pub const MIN_CASCADE_LENGTH: usize = 3;

/// A cascade traced from one resonant seed.
#[derive(Debug, Clone)]
pub struct Cascade<'a> {
    /// Cascade members, seed first
    pub members: Vec<&'a Superposition>,
    /// Deepest level reached, the seed being level 0
    pub depth: usize,
}

/// Breadth-first cascade from `seed`, at most `max_depth` levels deep.
pub fn trace_cascade<'a>(
    seed: &'a Superposition,
    pool: &'a [Superposition],
    max_depth: usize,
    claimed: &BTreeSet<&str>,
) -> Cascade<'a> {
    let mut in_cascade: BTreeSet<&str> = BTreeSet::from([seed.id().as_str()]);
    let mut members = vec![seed];
    let mut frontier = vec![seed];
    let mut depth = 0;

    while depth < max_depth && !frontier.is_empty() {
        let mut next = Vec::new();
        for current in &frontier {
            for candidate in pool {
                let id = candidate.id().as_str();
                if in_cascade.contains(id) || claimed.contains(id) {
                    continue;
                }
                if candidate.memory.resonance_strength > CASCADE_RESONANCE
                    && memory_similarity(&current.memory, &candidate.memory) > CASCADE_SIMILARITY
                {
                    in_cascade.insert(id);
                    members.push(candidate);
                    next.push(candidate);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        depth += 1;
        frontier = next;
    }
    Cascade { members, depth }
}

/// Trace cascades from every memory resonating above the threshold.
///
/// Seeds are visited strongest first and a memory belongs to at most one
/// cascade.
pub fn flashback_insights(pool: &[Superposition], config: &FlashbackConfig) -> Vec<EmergentInsight> {
    let mut seeds: Vec<&Superposition> = pool
        .iter()
        .filter(|s| s.memory.resonance_strength > config.threshold)
        .collect();
    seeds.sort_by(|a, b| {
        b.memory
            .resonance_strength
            .partial_cmp(&a.memory.resonance_strength)
            .unwrap_or(Ordering::Equal)
    });

    let mut claimed: BTreeSet<&str> = BTreeSet::new();
    let mut insights = Vec::new();
    for seed in seeds {
        if claimed.contains(seed.id().as_str()) {
            continue;
        }
        let cascade = trace_cascade(seed, pool, config.cascade_depth, &claimed);
        if cascade.members.len() < MIN_CASCADE_LENGTH {
            continue;
        }
        claimed.extend(cascade.members.iter().map(|s| s.id().as_str()));

        let resonances: Vec<f64> = cascade.members.iter().map(|s| s.memory.resonance_strength).collect();
        let reach = usize_to_f64(cascade.depth) / usize_to_f64(config.cascade_depth.max(1));
        let novelty = 0.3f64.mul_add(reach, 0.3);
        let ids: Vec<MemoryId> = cascade.members.iter().map(|s| s.id().clone()).collect();
        let description = format!(
            "Flashback from '{}' cascaded through {} resonant memories over {} levels",
            seed.memory.content.title,
            cascade.members.len(),
            cascade.depth
        );
        insights.push(
            EmergentInsight::new(InsightType::PatternSynthesis, description, ids, novelty, mean(&resonances))
                .with_suggested_action("Revisit the cascade as a single recurring theme"),
        );
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emergence::tests::superposition;
    use crate::types::{Coordinates, HarmonicCategory};

    fn resonant(id: &str, z: f64, resonance: f64) -> Superposition {
        let mut s = superposition(id, Coordinates::new(0.5, 0.5, z), HarmonicCategory::Wave, &["echo"], 0.2);
        let mut item = (*s.memory).clone();
        item.resonance_strength = resonance;
        s.memory = std::sync::Arc::new(item);
        s
    }

    #[test]
    fn test_cascade_needs_three_resonant_neighbours() {
        let config = FlashbackConfig::default();
        let pool = vec![resonant("seed", 0.5, 0.95), resonant("near", 0.52, 0.7), resonant("dull", 0.54, 0.3)];
        assert!(flashback_insights(&pool, &config).is_empty());

        let pool = vec![resonant("seed", 0.5, 0.95), resonant("near", 0.52, 0.7), resonant("also", 0.54, 0.65)];
        let insights = flashback_insights(&pool, &config);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].insight_type, InsightType::PatternSynthesis);
        assert_eq!(insights[0].contributing_memories[0], "seed");
    }

    #[test]
    fn test_depth_is_bounded() {
        let pool = vec![
            resonant("seed", 0.5, 0.95),
            resonant("one", 0.52, 0.7),
            resonant("two", 0.54, 0.7),
        ];
        let cascade = trace_cascade(&pool[0], &pool, 1, &BTreeSet::new());
        assert_eq!(cascade.depth, 1);
        assert!(cascade.members.len() <= pool.len());
    }

    #[test]
    fn test_memories_join_one_cascade_only() {
        let config = FlashbackConfig::default();
        let pool = vec![
            resonant("s1", 0.5, 0.95),
            resonant("s2", 0.51, 0.9),
            resonant("n1", 0.52, 0.7),
            resonant("n2", 0.53, 0.7),
        ];
        let insights = flashback_insights(&pool, &config);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].contributing_memories.len(), 4);
    }
}
