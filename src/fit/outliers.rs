//! Cross-residue outlier screening of fitted Ka values (Tukey IQR fences).

use serde::Serialize;

use crate::domain::ResidueFit;
use crate::math::{quantile_sorted, sorted_finite};

/// Quartiles and fences computed over one run's Ka values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Compute `[Q1 − k·IQR, Q3 + k·IQR]`. `None` for an empty input.
pub fn iqr_bounds(values: &[f64], k: f64) -> Option<IqrBounds> {
    let sorted = sorted_finite(values);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some(IqrBounds {
        q1,
        q3,
        iqr,
        lower: q1 - k * iqr,
        upper: q3 + k * iqr,
    })
}

/// Flag fits whose Ka lies outside the IQR fences. Ka values are never changed.
pub fn flag_outliers(fits: &mut [ResidueFit], k: f64) -> Option<IqrBounds> {
    let kas: Vec<f64> = fits.iter().map(|f| f.ka).collect();
    let bounds = iqr_bounds(&kas, k)?;

    for fit in fits.iter_mut() {
        fit.is_outlier = !bounds.contains(fit.ka);
        if fit.is_outlier {
            log::info!(
                "{}: Ka={:.4e} outside [{:.4e}, {:.4e}]",
                fit.residue,
                fit.ka,
                bounds.lower,
                bounds.upper
            );
        }
    }

    Some(bounds)
}
