//! Descriptive statistics used by goodness-of-fit and outlier screening.

use std::cmp::Ordering;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum of squared deviations from the mean.
pub fn total_sum_of_squares(values: &[f64]) -> f64 {
    let Some(m) = mean(values) else {
        return 0.0;
    };
    values.iter().map(|v| (v - m) * (v - m)).sum()
}

/// `1 - ssr/tss`.
///
/// A constant series has no variance to explain: a zero-residual fit counts as
/// perfect (1.0), anything else as 0.0.
pub fn r_squared(ssr: f64, tss: f64) -> f64 {
    if tss <= f64::EPSILON * ssr.abs().max(1.0) {
        return if ssr <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ssr / tss
}

/// Sorted copy with NaNs removed.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Quantile `q ∈ [0, 1]` of already-sorted data, linear interpolation between
/// order statistics (position `q·(n−1)`).
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_interpolate_between_order_statistics() {
        let v = sorted_finite(&[4.0, 1.0, 100.0, 3.0, 2.0]);
        assert_eq!(quantile_sorted(&v, 0.25), Some(2.0));
        assert_eq!(quantile_sorted(&v, 0.75), Some(4.0));

        let even = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile_sorted(&even, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn r_squared_handles_constant_series() {
        assert_eq!(r_squared(0.0, 0.0), 1.0);
        assert_eq!(r_squared(0.5, 0.0), 0.0);
        assert!((r_squared(1.0, 4.0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn total_sum_of_squares_basic() {
        assert!((total_sum_of_squares(&[0.0, 0.5, 0.9]) - 0.4066666666666667).abs() < 1e-12);
        assert_eq!(total_sum_of_squares(&[]), 0.0);
    }
}
