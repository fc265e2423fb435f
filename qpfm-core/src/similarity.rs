//! Pairwise similarity between memory items.
//!
//! Cluster assignment, batch association mining, and every emergent mechanism
//! share one metric: a weighted mix of spatial proximity (0.4), harmonic
//! category match (0.3), and tag overlap (0.3).

use crate::numeric::{floored, usize_to_f64};
use crate::types::{MAX_DISTANCE, MemoryItem};

pub const SPATIAL_WEIGHT: f64 = 0.4;
pub const CATEGORY_WEIGHT: f64 = 0.3;
pub const TAG_WEIGHT: f64 = 0.3;

/// Similarity of two items in `[0,1]`.
#[must_use]
pub fn memory_similarity(a: &MemoryItem, b: &MemoryItem) -> f64 {
    let spatial = 1.0 - (a.coordinates.distance(&b.coordinates) / MAX_DISTANCE).min(1.0);
    let category = if a.category() == b.category() { 1.0 } else { 0.0 };
    let tags = tag_overlap(a, b);
    (SPATIAL_WEIGHT * spatial + CATEGORY_WEIGHT * category + TAG_WEIGHT * tags).clamp(0.0, 1.0)
}

/// Jaccard overlap of the two tag sets; zero when both are empty.
#[must_use]
pub fn tag_overlap(a: &MemoryItem, b: &MemoryItem) -> f64 {
    let shared = a.content.tags.intersection(&b.content.tags).count();
    let union = a.content.tags.union(&b.content.tags).count();
    usize_to_f64(shared) / floored(usize_to_f64(union), 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coordinates, HarmonicCategory, HarmonicSignature, MemoryContent};

    fn item(id: &str, at: Coordinates, category: HarmonicCategory, tags: &[&str]) -> MemoryItem {
        MemoryItem::new(
            id,
            at,
            MemoryContent::new(id, HarmonicSignature::new(category, 0.5, 0.5))
                .with_tags(tags.iter().copied()),
        )
    }

    #[test]
    fn test_identical_items_are_fully_similar() {
        let a = item("a", Coordinates::CENTER, HarmonicCategory::Wave, &["x", "y"]);
        let b = item("b", Coordinates::CENTER, HarmonicCategory::Wave, &["x", "y"]);
        assert!((memory_similarity(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_opposite_corners_share_nothing() {
        let a = item("a", Coordinates::new(0.0, 0.0, 0.0), HarmonicCategory::Wave, &["x"]);
        let b = item("b", Coordinates::new(1.0, 1.0, 1.0), HarmonicCategory::Fractal, &["y"]);
        assert!(memory_similarity(&a, &b).abs() < 1e-12);
    }

    #[test]
    fn test_untagged_items_do_not_divide_by_zero() {
        let a = item("a", Coordinates::CENTER, HarmonicCategory::Wave, &[]);
        let b = item("b", Coordinates::CENTER, HarmonicCategory::Wave, &[]);
        assert_eq!(tag_overlap(&a, &b), 0.0);
        assert!((memory_similarity(&a, &b) - 0.7).abs() < 1e-12);
    }
}
