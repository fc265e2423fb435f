//! Creative synthesis: strong interference patterns and cross-category bridges.

use crate::config::CreativeSynthesisConfig;
use crate::numeric::mean;
use crate::similarity::memory_similarity;
use crate::superposition::{InterferencePattern, Superposition};
use crate::types::{EmergentInsight, HarmonicCategory, InsightType, MemoryId};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Pattern strength required before it is synthesized.
pub const MIN_PATTERN_STRENGTH: f64 = 0.5;

/// Similarity a cross-category pair needs to count as a link.
pub const BRIDGE_SIMILARITY: f64 = 0.5;

/// Strongest links kept per category pair.
pub const MAX_BRIDGE_LINKS: usize = 3;

/// Links a category pair needs before a bridge is reported.
pub const MIN_BRIDGE_LINKS: usize = 2;

/// One insight per strong, novel, sufficiently large interference pattern.
pub fn pattern_insights(
    patterns: &[InterferencePattern],
    config: &CreativeSynthesisConfig,
) -> Vec<EmergentInsight> {
    patterns
        .iter()
        .filter(|p| {
            p.strength > MIN_PATTERN_STRENGTH
                && p.novelty_score > config.novelty_threshold
                && p.involved_memories.len() >= config.minimum_patterns
        })
        .map(|pattern| {
            let properties: Vec<&str> = pattern.emergent_properties.iter().map(String::as_str).collect();
            let description = if properties.is_empty() {
                format!(
                    "{} memories interfere constructively ({:?})",
                    pattern.involved_memories.len(),
                    pattern.mechanism
                )
            } else {
                format!(
                    "{} memories interfere constructively ({:?}) sharing {}",
                    pattern.involved_memories.len(),
                    pattern.mechanism,
                    properties.join(", ")
                )
            };
            EmergentInsight::new(
                InsightType::PatternSynthesis,
                description,
                pattern.involved_memories.clone(),
                pattern.novelty_score,
                pattern.confidence_level,
            )
            .with_suggested_action("Combine these memories into a new synthesis")
        })
        .collect()
}

/// Cross-category bridges built from the strongest links between two categories.
pub fn bridge_insights(pool: &[Superposition]) -> Vec<EmergentInsight> {
    let mut by_category: BTreeMap<HarmonicCategory, Vec<&Superposition>> = BTreeMap::new();
    for superposition in pool {
        by_category
            .entry(superposition.memory.category())
            .or_default()
            .push(superposition);
    }
    let categories: Vec<(&HarmonicCategory, &Vec<&Superposition>)> = by_category.iter().collect();

    let mut insights = Vec::new();
    for (i, (first, left)) in categories.iter().enumerate() {
        for (second, right) in &categories[i + 1..] {
            let mut links: Vec<(&Superposition, &Superposition, f64)> = left
                .iter()
                .flat_map(|a| right.iter().map(move |b| (*a, *b, memory_similarity(&a.memory, &b.memory))))
                .filter(|(_, _, similarity)| *similarity > BRIDGE_SIMILARITY)
                .collect();
            links.sort_by(|x, y| y.2.partial_cmp(&x.2).unwrap_or(Ordering::Equal));
            links.truncate(MAX_BRIDGE_LINKS);
            if links.len() < MIN_BRIDGE_LINKS {
                continue;
            }

            let mut seen = BTreeSet::new();
            let ids: Vec<MemoryId> = links
                .iter()
                .flat_map(|(a, b, _)| [a.id(), b.id()])
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect();
            let strengths: Vec<f64> = links.iter().map(|(_, _, s)| *s).collect();
            insights.push(
                EmergentInsight::new(
                    InsightType::PatternSynthesis,
                    format!("{} links bridge {first} and {second} memories", links.len()),
                    ids,
                    0.7,
                    mean(&strengths),
                )
                .with_suggested_action(format!("Explore how {first} ideas carry over to {second}")),
            );
        }
    }
    insights
}
