//! Symmetric association strengths between memory pairs.
//!
//! Pairs are stored under a canonical `(min_id, max_id)` key, so `(a, b)` and
//! `(b, a)` always read and write the same cell. Self-pairs are never stored.

use crate::numeric::usize_to_f64;
use crate::types::MemoryId;
use dashmap::DashMap;
use std::cmp::Ordering;

/// Associations weaker than this are dropped during decay.
pub const PRUNE_BELOW: f64 = 0.01;

/// Concurrent, symmetric association matrix with strengths in `[0,1]`.
#[derive(Debug, Default)]
pub struct AssociationMatrix {
    cells: DashMap<(MemoryId, MemoryId), f64>,
}

impl AssociationMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Strength between two items; zero when unknown or when `a == b`.
    #[must_use]
    pub fn strength(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 0.0;
        }
        self.cells
            .get(&canonical_pair(a, b))
            .map_or(0.0, |cell| *cell.value())
    }

    /// Add `bonus` to a pair, capped at 1. Returns the new strength.
    pub fn strengthen(&self, a: &str, b: &str, bonus: f64) -> f64 {
        if a == b {
            return 0.0;
        }
        let mut cell = self.cells.entry(canonical_pair(a, b)).or_insert(0.0);
        *cell = (*cell + bonus.max(0.0)).min(1.0);
        *cell
    }

    /// Raise a pair to at least `value`, never lowering an existing strength.
    pub fn reinforce_to(&self, a: &str, b: &str, value: f64) -> f64 {
        if a == b {
            return 0.0;
        }
        let mut cell = self.cells.entry(canonical_pair(a, b)).or_insert(0.0);
        *cell = cell.max(value.clamp(0.0, 1.0));
        *cell
    }

    /// Every association touching `id`, strongest first.
    #[must_use]
    pub fn neighbors(&self, id: &str) -> Vec<(MemoryId, f64)> {
        let mut found: Vec<(MemoryId, f64)> = self
            .cells
            .iter()
            .filter_map(|cell| {
                let (a, b) = cell.key();
                if a == id {
                    Some((b.clone(), *cell.value()))
                } else if b == id {
                    Some((a.clone(), *cell.value()))
                } else {
                    None
                }
            })
            .collect();
        found.sort_by(|x, y| {
            y.1.partial_cmp(&x.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| x.0.cmp(&y.0))
        });
        found
    }

    /// Multiply every strength by `1 - rate` and drop those below [`PRUNE_BELOW`].
    ///
    /// Returns the number of pruned pairs.
    pub fn decay(&self, rate: f64) -> usize {
        let factor = 1.0 - rate.clamp(0.0, 1.0);
        let before = self.cells.len();
        self.cells.retain(|_, strength| {
            *strength *= factor;
            *strength >= PRUNE_BELOW
        });
        before.saturating_sub(self.cells.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn statistics(&self) -> AssociationStatistics {
        let pairs = self.cells.len();
        let total: f64 = self.cells.iter().map(|cell| *cell.value()).sum();
        let strongest = self
            .cells
            .iter()
            .map(|cell| *cell.value())
            .fold(0.0_f64, f64::max);
        AssociationStatistics {
            pairs,
            average_strength: if pairs > 0 { total / usize_to_f64(pairs) } else { 0.0 },
            strongest,
        }
    }
}

/// Summary of the association matrix.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct AssociationStatistics {
    /// Distinct associated pairs
    pub pairs: usize,
    /// Mean strength over those pairs
    pub average_strength: f64,
    /// Largest strength, 0.0 when empty
    pub strongest: f64,
}

fn canonical_pair(a: &str, b: &str) -> (MemoryId, MemoryId) {
    if a < b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_pair_ordering() {
        assert_eq!(canonical_pair("alpha", "beta"), canonical_pair("beta", "alpha"));
        assert_eq!(canonical_pair("beta", "alpha").0, "alpha");
    }

    #[test]
    fn test_strengthen_is_symmetric_and_capped() {
        let matrix = AssociationMatrix::new();
        matrix.strengthen("a", "b", 0.05);
        assert!((matrix.strength("a", "b") - 0.05).abs() < 1e-12);
        assert!((matrix.strength("b", "a") - 0.05).abs() < 1e-12);

        for _ in 0..40 {
            matrix.strengthen("b", "a", 0.05);
        }
        assert!((matrix.strength("a", "b") - 1.0).abs() < 1e-12);
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn test_self_pairs_are_ignored() {
        let matrix = AssociationMatrix::new();
        assert_eq!(matrix.strengthen("a", "a", 0.5), 0.0);
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_reinforce_never_lowers() {
        let matrix = AssociationMatrix::new();
        matrix.reinforce_to("a", "b", 0.8);
        matrix.reinforce_to("a", "b", 0.6);
        assert!((matrix.strength("a", "b") - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_decay_prunes_weak_pairs() {
        let matrix = AssociationMatrix::new();
        matrix.strengthen("a", "b", 0.5);
        matrix.strengthen("a", "c", 0.0105);
        let pruned = matrix.decay(0.05);
        assert_eq!(pruned, 1);
        assert!((matrix.strength("a", "b") - 0.475).abs() < 1e-12);
        assert_eq!(matrix.strength("a", "c"), 0.0);
    }

    #[test]
    fn test_neighbors_sorted_by_strength() {
        let matrix = AssociationMatrix::new();
        matrix.strengthen("hub", "weak", 0.1);
        matrix.strengthen("strong", "hub", 0.9);
        matrix.strengthen("x", "y", 0.5);
        let neighbors = matrix.neighbors("hub");
        let ids: Vec<&str> = neighbors.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["strong", "weak"]);
    }
}
