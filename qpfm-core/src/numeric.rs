//! Numeric helpers shared across the engine.
//!
//! Every ratio in the scoring and learning math goes through these helpers so
//! that denominators are floored instead of producing NaN or infinity.

/// Convert a `usize` to `f64`, accepting precision loss above 2^53.
pub const fn usize_to_f64(value: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        value as f64
    }
}

/// Convert a `u64` to `f64`, accepting precision loss above 2^53.
pub const fn u64_to_f64(value: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        value as f64
    }
}

/// Convert an `i64` to `f64`, accepting precision loss above 2^53.
pub const fn i64_to_f64(value: i64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        value as f64
    }
}

/// Raise `value` to at least `floor`; NaN maps to `floor`.
pub fn floored(value: f64, floor: f64) -> f64 {
    if value.is_nan() { floor } else { value.max(floor) }
}

/// Ratio with the denominator floored at `f64::EPSILON`.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    numerator / floored(denominator.abs(), f64::EPSILON).copysign(denominator)
}

/// Arithmetic mean, zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / usize_to_f64(values.len())
}

/// Population variance, zero for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / usize_to_f64(values.len())
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_ratio_never_divides_by_zero() {
        assert!(safe_ratio(1.0, 0.0).is_finite());
        assert!((safe_ratio(1.0, 4.0) - 0.25).abs() < 1e-12);
        assert!((safe_ratio(1.0, -4.0) + 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_statistics_on_empty_input() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        assert!((std_dev(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
