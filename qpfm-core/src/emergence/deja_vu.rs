//! Déjà vu: half-relevant, poorly understood memories that resemble each other.
//!
//! Insights from this mechanism carry deliberately low confidence. They are
//! prompts for a wider follow-up search, not conclusions.

use crate::config::DejaVuConfig;
use crate::numeric::mean;
use crate::similarity::memory_similarity;
use crate::superposition::Superposition;
use crate::types::{EmergentInsight, InsightType, MemoryId};

/// Probability band, exclusive on both ends, for a memory to feel familiar.
pub const FAMILIAR_BAND: (f64, f64) = (0.2, 0.6);

/// Similarity two familiar memories need to share a group.
pub const GROUP_SIMILARITY: f64 = 0.6;

/// Highest confidence a déjà vu insight is given.
pub const MAX_DEJA_VU_CONFIDENCE: f64 = 0.3;

/// Whether a superposition falls in the familiar-but-uncertain zone.
#[must_use]
pub fn is_familiar(superposition: &Superposition, config: &DejaVuConfig) -> bool {
    superposition.probability > FAMILIAR_BAND.0
        && superposition.probability < FAMILIAR_BAND.1
        && superposition.memory.confidence_score < config.uncertainty_threshold
}

/// Greedy grouping: each ungrouped memory collects the ungrouped ones similar to it.
pub fn familiar_groups<'a>(candidates: &[&'a Superposition]) -> Vec<Vec<&'a Superposition>> {
    let mut grouped = vec![false; candidates.len()];
    let mut groups = Vec::new();
    for (i, anchor) in candidates.iter().enumerate() {
        if grouped[i] {
            continue;
        }
        let mut group = vec![*anchor];
        for (j, other) in candidates.iter().enumerate().skip(i + 1) {
            if !grouped[j] && memory_similarity(&anchor.memory, &other.memory) > GROUP_SIMILARITY {
                grouped[j] = true;
                group.push(*other);
            }
        }
        grouped[i] = true;
        if group.len() >= 2 {
            groups.push(group);
        }
    }
    groups
}

pub fn deja_vu_insights(pool: &[Superposition], config: &DejaVuConfig) -> Vec<EmergentInsight> {
    let candidates: Vec<&Superposition> = pool.iter().filter(|s| is_familiar(s, config)).collect();
    familiar_groups(&candidates)
        .into_iter()
        .map(|group| {
            let confidences: Vec<f64> = group.iter().map(|s| s.memory.confidence_score).collect();
            let confidence = (mean(&confidences) * 0.5).min(MAX_DEJA_VU_CONFIDENCE);
            let probabilities: Vec<f64> = group.iter().map(|s| s.probability).collect();
            // Familiarity peaks in the middle of the band.
            let novelty = 1.0 - (mean(&probabilities) - 0.4).abs() * 2.5;
            let ids: Vec<MemoryId> = group.iter().map(|s| s.id().clone()).collect();
            EmergentInsight::new(
                InsightType::UnexpectedRelevance,
                format!(
                    "{} uncertain memories feel related; '{}' may matter more than its score suggests",
                    group.len(),
                    group[0].memory.content.title
                ),
                ids,
                novelty,
                confidence,
            )
            .with_suggested_action(format!(
                "Search again with exploration widened {:.1}x around these memories",
                config.expansion_factor
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emergence::tests::superposition;
    use crate::types::{Coordinates, HarmonicCategory};

    fn uncertain(id: &str, probability: f64, confidence: f64) -> Superposition {
        let mut s = superposition(id, Coordinates::CENTER, HarmonicCategory::Topological, &["fog"], probability);
        let mut item = (*s.memory).clone();
        item.confidence_score = confidence;
        s.memory = std::sync::Arc::new(item);
        s
    }

    #[test]
    fn test_band_edges_are_exclusive() {
        let config = DejaVuConfig::default();
        assert!(!is_familiar(&uncertain("a", 0.2, 0.1), &config));
        assert!(!is_familiar(&uncertain("a", 0.6, 0.1), &config));
        assert!(is_familiar(&uncertain("a", 0.4, 0.1), &config));
        assert!(!is_familiar(&uncertain("a", 0.4, 0.9), &config));
    }

    #[test]
    fn test_similar_uncertain_pair_forms_low_confidence_insight() {
        let config = DejaVuConfig::default();
        let pool = vec![uncertain("a", 0.35, 0.2), uncertain("b", 0.3, 0.25), uncertain("c", 0.05, 0.2)];
        let insights = deja_vu_insights(&pool, &config);
        assert_eq!(insights.len(), 1);
        let insight = &insights[0];
        assert_eq!(insight.insight_type, InsightType::UnexpectedRelevance);
        assert_eq!(insight.contributing_memories, vec!["a".to_string(), "b".to_string()]);
        assert!(insight.confidence_level <= MAX_DEJA_VU_CONFIDENCE);
        assert!(insight.suggested_action.is_some());
    }

    #[test]
    fn test_lone_familiar_memory_is_not_reported() {
        let config = DejaVuConfig::default();
        let pool = vec![uncertain("a", 0.4, 0.2)];
        assert!(deja_vu_insights(&pool, &config).is_empty());
    }
}
