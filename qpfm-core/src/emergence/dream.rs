//! Dream walks: a bounded random traversal across loosely similar memories.

use crate::numeric::{mean, usize_to_f64};
use crate::similarity::memory_similarity;
use crate::superposition::Superposition;
use crate::types::{EmergentInsight, HarmonicCategory, InsightType, MemoryId};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};

/// Similarity an unvisited neighbour needs to continue the walk.
pub const DREAM_LINK_THRESHOLD: f64 = 0.3;

/// Walk length range, upper bound exclusive.
pub const DREAM_STEPS: std::ops::Range<usize> = 5..15;

/// Fewest visited memories that make a walk worth reporting.
pub const MIN_DREAM_VISITS: usize = 3;

/// Walk from a random start, hopping to random unvisited neighbours.
///
/// Returns the visited memories in order along with the similarity of each
/// hop. The walk stops early when no unvisited neighbour clears
/// [`DREAM_LINK_THRESHOLD`].
pub fn dream_walk<'a, R: Rng + ?Sized>(
    pool: &'a [Superposition],
    rng: &mut R,
) -> (Vec<&'a Superposition>, Vec<f64>) {
    let Some(start) = pool.choose(rng) else {
        return (Vec::new(), Vec::new());
    };
    let steps = rng.gen_range(DREAM_STEPS);
    let mut visited: BTreeSet<&str> = BTreeSet::from([start.id().as_str()]);
    let mut path = vec![start];
    let mut hops = Vec::new();
    let mut current = start;

    for _ in 0..steps {
        let neighbours: Vec<(&Superposition, f64)> = pool
            .iter()
            .filter(|candidate| !visited.contains(candidate.id().as_str()))
            .map(|candidate| (candidate, memory_similarity(&current.memory, &candidate.memory)))
            .filter(|(_, similarity)| *similarity > DREAM_LINK_THRESHOLD)
            .collect();
        let Some(&(next, similarity)) = neighbours.choose(rng) else {
            break;
        };
        visited.insert(next.id().as_str());
        path.push(next);
        hops.push(similarity);
        current = next;
    }
    (path, hops)
}

/// Run one dream walk and describe it if it visited enough memories.
pub fn dream_insight<R: Rng + ?Sized>(pool: &[Superposition], rng: &mut R) -> Option<EmergentInsight> {
    let (path, hops) = dream_walk(pool, rng);
    if path.len() < MIN_DREAM_VISITS {
        tracing::trace!(visited = path.len(), "dream walk too short");
        return None;
    }

    let categories: BTreeSet<HarmonicCategory> = path.iter().map(|s| s.memory.category()).collect();
    let mut tag_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for step in &path {
        for tag in &step.memory.content.tags {
            *tag_counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    let recurring: Vec<&str> = tag_counts
        .iter()
        .filter(|(_, count)| **count >= 2)
        .map(|(tag, _)| *tag)
        .collect();

    let category_list: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
    let description = if recurring.is_empty() {
        format!(
            "Dream walk connected {} memories across {}",
            path.len(),
            category_list.join(", ")
        )
    } else {
        format!(
            "Dream walk connected {} memories across {} through {}",
            path.len(),
            category_list.join(", "),
            recurring.join(", ")
        )
    };

    let diversity = usize_to_f64(categories.len()) / usize_to_f64(path.len());
    let novelty = 0.6f64.mul_add(diversity, 0.4);
    let confidence = 0.4f64.mul_add(mean(&hops), 0.2);
    let ids: Vec<MemoryId> = path.iter().map(|s| s.id().clone()).collect();
    Some(
        EmergentInsight::new(InsightType::NovelConnection, description, ids, novelty, confidence)
            .with_suggested_action("Review the walked memories for a shared theme"),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::emergence::tests::superposition;
    use crate::types::Coordinates;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_walk_visits_each_memory_at_most_once() {
        let pool: Vec<Superposition> = (0..8)
            .map(|i| {
                superposition(
                    &format!("m{i}"),
                    Coordinates::new(0.5, 0.5, 0.1 * f64::from(i)),
                    HarmonicCategory::Wave,
                    &["tide"],
                    0.1,
                )
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let (path, hops) = dream_walk(&pool, &mut rng);
        let unique: BTreeSet<&str> = path.iter().map(|s| s.id().as_str()).collect();
        assert_eq!(unique.len(), path.len());
        assert_eq!(hops.len() + 1, path.len());
        assert!(path.len() >= MIN_DREAM_VISITS);
        assert!(hops.iter().all(|h| *h > DREAM_LINK_THRESHOLD));
    }

    #[test]
    fn test_disconnected_pool_yields_nothing() {
        let pool = vec![
            superposition("a", Coordinates::new(0.0, 0.0, 0.0), HarmonicCategory::Wave, &["x"], 0.5),
            superposition("b", Coordinates::new(1.0, 1.0, 1.0), HarmonicCategory::Fractal, &["y"], 0.5),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(dream_insight(&pool, &mut rng).is_none());
    }

    #[test]
    fn test_seeded_walks_are_reproducible() {
        let pool: Vec<Superposition> = (0..6)
            .map(|i| {
                superposition(
                    &format!("m{i}"),
                    Coordinates::new(0.1 * f64::from(i), 0.5, 0.5),
                    if i % 2 == 0 { HarmonicCategory::Wave } else { HarmonicCategory::Fractal },
                    &["shared"],
                    0.1,
                )
            })
            .collect();
        let first = dream_walk(&pool, &mut StdRng::seed_from_u64(99)).0;
        let second = dream_walk(&pool, &mut StdRng::seed_from_u64(99)).0;
        let ids = |path: &[&Superposition]| path.iter().map(|s| s.id().clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_insight_names_recurring_tags() {
        let pool: Vec<Superposition> = (0..4)
            .map(|i| {
                superposition(
                    &format!("m{i}"),
                    Coordinates::new(0.5, 0.5, 0.5),
                    HarmonicCategory::Wave,
                    &["orbit"],
                    0.2,
                )
            })
            .collect();
        let insight = dream_insight(&pool, &mut StdRng::seed_from_u64(3)).expect("walk long enough");
        assert_eq!(insight.insight_type, InsightType::NovelConnection);
        assert!(insight.description.contains("orbit"));
        assert!(insight.contributing_memories.len() >= MIN_DREAM_VISITS);
    }
}
