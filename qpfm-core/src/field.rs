//! Probability fields over the coordinate space.
//!
//! A field is built fresh for every query and weights each point of the unit
//! cube by its relevance. The numeric falloff and the harmonic phase hash are
//! strategies ([`FieldShapeFunction`], [`PhaseFunction`]) so integrators can
//! swap in their own tuning; the engine only relies on the properties
//! documented on each trait.

use crate::config::FieldConfig;
use crate::types::{Coordinates, HarmonicSignature, MemoryQuery, QueryType};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt::Debug;

/// Wavelength used to turn distance from the field centre into phase.
pub const REFERENCE_WAVELENGTH: f64 = 0.25;

/// Geometry used to measure distance from the field centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Spherical,
    /// Compressed along z, so the field reaches further in depth
    Elliptical,
    /// Radius widens with the exploration bias
    Adaptive,
    /// Heavy-tailed distance warp controlled by the morphing rate
    Fractal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FalloffFunction {
    Exponential,
    Polynomial,
    Gaussian,
    Sigmoid,
}

/// Relevance weighting for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityField {
    /// Point of peak relevance
    pub center: Coordinates,
    /// Base radius before shape-specific widening
    pub radius: f64,
    /// Geometry of the equal-relevance surfaces
    pub shape: FieldShape,
    /// Curve used between the centre and the radius
    pub falloff_function: FalloffFunction,
    /// Peak relevance at the centre
    pub amplitude: f64,
    /// Rate `k` of the falloff curve
    pub gradient_steepness: f64,
    /// Warps normalized distance for fractal fields; 0.0 leaves it linear
    pub morphing_rate: f64,
    /// Descriptive only; the standard falloff ignores it
    pub context_sensitivity: f64,
    /// Widens adaptive fields by up to half their radius
    pub exploration_bias: f64,
}

impl ProbabilityField {
    /// Spherical exponential field with unit amplitude.
    #[must_use]
    pub const fn new(center: Coordinates, radius: f64) -> Self {
        Self {
            center,
            radius,
            shape: FieldShape::Spherical,
            falloff_function: FalloffFunction::Exponential,
            amplitude: 1.0,
            gradient_steepness: 2.0,
            morphing_rate: 0.0,
            context_sensitivity: 0.0,
            exploration_bias: 0.0,
        }
    }

    /// Build the field for a query type.
    ///
    /// Precision queries get a narrow spherical field with a steep falloff,
    /// discovery queries a wider adaptive field with a shallow falloff, and
    /// creative queries a fractal field with a high morphing rate.
    #[must_use]
    pub fn for_query(query: &MemoryQuery, center: Coordinates, config: &FieldConfig) -> Self {
        let exploration = query.exploration.clamp(0.0, 1.0);
        let amplitude = 0.5f64.mul_add(query.confidence.clamp(0.0, 1.0), 0.5);
        match query.query_type {
            QueryType::Precision => Self {
                center,
                radius: config.precision_radius * 0.5f64.mul_add(exploration, 1.0),
                shape: FieldShape::Spherical,
                falloff_function: FalloffFunction::Exponential,
                amplitude,
                gradient_steepness: 4.0,
                morphing_rate: 0.0,
                context_sensitivity: 0.2,
                exploration_bias: exploration * 0.1,
            },
            QueryType::Discovery => Self {
                center,
                radius: config.discovery_radius * (1.0 + exploration),
                shape: FieldShape::Adaptive,
                falloff_function: FalloffFunction::Gaussian,
                amplitude,
                gradient_steepness: 1.0,
                morphing_rate: 0.2,
                context_sensitivity: 0.5,
                exploration_bias: exploration,
            },
            QueryType::Creative => Self {
                center,
                radius: config.creative_radius * (1.0 + exploration),
                shape: FieldShape::Fractal,
                falloff_function: FalloffFunction::Sigmoid,
                amplitude,
                gradient_steepness: 2.0,
                morphing_rate: 0.8,
                context_sensitivity: 0.8,
                exploration_bias: exploration.max(0.5),
            },
        }
    }

    /// Radius after shape-specific widening, floored to stay positive.
    #[must_use]
    pub fn effective_radius(&self) -> f64 {
        let widened = match self.shape {
            FieldShape::Spherical | FieldShape::Elliptical | FieldShape::Fractal => self.radius,
            FieldShape::Adaptive => self.radius * 0.5f64.mul_add(self.exploration_bias, 1.0),
        };
        crate::numeric::floored(widened, 1e-6)
    }

    /// Distance from the centre in units of the effective radius, warped by shape.
    #[must_use]
    pub fn normalized_distance(&self, point: &Coordinates) -> f64 {
        let raw = match self.shape {
            FieldShape::Elliptical => {
                let dx = point.x - self.center.x;
                let dy = point.y - self.center.y;
                let dz = (point.z - self.center.z) * 0.5;
                (dx * dx + dy * dy + dz * dz).sqrt()
            }
            FieldShape::Spherical | FieldShape::Adaptive | FieldShape::Fractal => {
                point.distance(&self.center)
            }
        };
        let normalized = raw / self.effective_radius();
        match self.shape {
            FieldShape::Fractal => {
                normalized.powf(0.3f64.mul_add(-self.morphing_rate.clamp(0.0, 1.0), 1.0))
            }
            _ => normalized,
        }
    }

    /// Relevance weight of `point` using the standard falloff.
    #[must_use]
    pub fn probability(&self, point: &Coordinates) -> f64 {
        StandardFalloff.probability(point, self)
    }
}

/// Maps a point to a relevance weight under a field.
///
/// Implementations must return a value in `[0,1]` that never increases as the
/// point moves away from `field.center` along a ray.
pub trait FieldShapeFunction: Send + Sync + Debug {
    fn probability(&self, point: &Coordinates, field: &ProbabilityField) -> f64;
}

/// Falloff curves selected by [`ProbabilityField::falloff_function`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFalloff;

impl FieldShapeFunction for StandardFalloff {
    fn probability(&self, point: &Coordinates, field: &ProbabilityField) -> f64 {
        let x = field.normalized_distance(point);
        let k = crate::numeric::floored(field.gradient_steepness, 0.0);
        let weight = match field.falloff_function {
            FalloffFunction::Exponential => (-k * x).exp(),
            FalloffFunction::Polynomial => (1.0 + x).powf(-k),
            FalloffFunction::Gaussian => (-k * x * x).exp(),
            FalloffFunction::Sigmoid => (1.0 + (-k).exp()) / (1.0 + (k * (x - 1.0)).exp()),
        };
        let value = field.amplitude * weight;
        if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 }
    }
}

/// Assigns a phase in `[0, 2π)` to an item relative to a field centre.
pub trait PhaseFunction: Send + Sync + Debug {
    /// Stable phase derived from the signature alone.
    fn harmonic_phase(&self, signature: &HarmonicSignature) -> f64;

    /// Phase contributed by distance from the field centre.
    fn distance_phase(&self, distance: f64) -> f64;

    /// Combined phase wrapped into `[0, 2π)`.
    fn phase(&self, signature: &HarmonicSignature, position: &Coordinates, center: &Coordinates) -> f64 {
        wrap_phase(self.harmonic_phase(signature) + self.distance_phase(position.distance(center)))
    }
}

/// Default phase hash: category sector plus strength and complexity offsets.
#[derive(Debug, Clone, Copy)]
pub struct HarmonicPhase {
    /// Distance-phase period in coordinate units
    pub wavelength: f64,
}

impl Default for HarmonicPhase {
    fn default() -> Self {
        Self {
            wavelength: REFERENCE_WAVELENGTH,
        }
    }
}

impl PhaseFunction for HarmonicPhase {
    fn harmonic_phase(&self, signature: &HarmonicSignature) -> f64 {
        let sectors = crate::numeric::usize_to_f64(crate::types::HarmonicCategory::ALL.len());
        let sector = TAU / sectors;
        let base = crate::numeric::usize_to_f64(signature.category.ordinal()) * sector;
        let offset = sector * 0.5f64.mul_add(signature.complexity.clamp(0.0, 1.0), 0.5 * signature.strength.clamp(0.0, 1.0));
        wrap_phase(base + offset * 0.999)
    }

    fn distance_phase(&self, distance: f64) -> f64 {
        (distance / crate::numeric::floored(self.wavelength, 1e-9)) * TAU
    }
}

/// Wrap any finite angle into `[0, 2π)`; non-finite input maps to zero.
#[must_use]
pub fn wrap_phase(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}
