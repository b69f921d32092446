//! Initial-guess grid for the association constant.
//!
//! The isotherm's SSR surface in Ka is flat on both sides (fully saturated and
//! fully unbound curves look alike to the optimizer), so a single start easily
//! stalls in the wrong basin. We start Levenberg–Marquardt from a deterministic
//! log-spaced set of Ka values and keep the best converged result.

use crate::error::AppError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::new(
            crate::error::ErrorKind::Usage,
            format!("Invalid Ka range: min={min}, max={max} (must be finite, >0, and max>min)."),
        ));
    }
    if steps < 2 {
        return Err(AppError::new(
            crate::error::ErrorKind::Usage,
            "Ka start count must be >= 2.",
        ));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(1.0, 1e5, 20).unwrap();
        assert_eq!(v.len(), 20);
        assert!((v[0] - 1.0).abs() < 1e-12);
        assert!((v[v.len() - 1] - 1e5).abs() < 1e-6);
    }

    #[test]
    fn log_space_has_constant_ratio() {
        let v = log_space(1.0, 1e5, 20).unwrap();
        let r0 = v[1] / v[0];
        for w in v.windows(2) {
            assert!((w[1] / w[0] - r0).abs() < 1e-9);
        }
    }

    #[test]
    fn invalid_range_is_a_usage_error() {
        let err = log_space(10.0, 1.0, 20).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Usage);
        assert!(log_space(1.0, 10.0, 1).is_err());
    }
}
