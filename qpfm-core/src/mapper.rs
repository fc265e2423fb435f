//! Coordinate mapping for query signatures.
//!
//! Stored items arrive with coordinates already assigned upstream. The
//! engine only maps a *query's* signature to a field centre, through the
//! [`CoordinateMapper`] seam.

use crate::numeric::usize_to_f64;
use crate::types::{Coordinates, HarmonicCategory, HarmonicSignature};
use std::fmt::Debug;

/// Deterministic placement of a harmonic signature inside `[0,1]^3`.
pub trait CoordinateMapper: Send + Sync + Debug {
    fn map(&self, signature: &HarmonicSignature) -> Coordinates;
}

/// Category picks the x band, strength the y axis, and complexity blended
/// with occurrence count the z axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarmonicCoordinateMapper;

/// Occurrence count at which the z contribution saturates.
const OCCURRENCE_SATURATION: f64 = 1_000.0;

impl CoordinateMapper for HarmonicCoordinateMapper {
    fn map(&self, signature: &HarmonicSignature) -> Coordinates {
        let bands = usize_to_f64(HarmonicCategory::ALL.len());
        let x = (usize_to_f64(signature.category.ordinal()) + 0.5) / bands;
        let y = signature.strength;
        let occurrences = (f64::from(signature.occurrences).ln_1p() / OCCURRENCE_SATURATION.ln_1p()).min(1.0);
        let z = 0.7f64.mul_add(signature.complexity, 0.3 * occurrences);
        Coordinates::new(x, y, z).clamped()
    }
}
