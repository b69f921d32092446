//! Read/write fitted-curve JSON files.
//!
//! A curves file holds, per fitted residue, the best-fit parameters and the
//! sampled model prediction (guest/host ratio vs response), plus run metadata.
//! It is the portable input for external plotting.

#[cfg(test)]
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FitCurve, ResidueFit};
use crate::error::{AppError, ErrorKind};
use crate::io::export::create;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvesFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub shift_weight: f64,
    pub residues: Vec<CurveEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveEntry {
    pub residue: String,
    pub ka: f64,
    pub delta_hg: f64,
    pub delta_h: f64,
    pub r_squared: f64,
    pub is_outlier: bool,
    pub curve: FitCurve,
}

impl CurvesFile {
    /// Pair fits with their sampled curves by residue label.
    pub fn build(source: &str, shift_weight: f64, fits: &[ResidueFit], curves: &[FitCurve]) -> Self {
        let residues = fits
            .iter()
            .filter_map(|fit| {
                let curve = curves.iter().find(|c| c.residue == fit.residue)?;
                Some(CurveEntry {
                    residue: fit.residue.clone(),
                    ka: fit.ka,
                    delta_hg: fit.delta_hg,
                    delta_h: fit.delta_h,
                    r_squared: fit.r_squared,
                    is_outlier: fit.is_outlier,
                    curve: curve.clone(),
                })
            })
            .collect();

        Self {
            tool: "csp".to_string(),
            generated_at: Utc::now(),
            source: source.to_string(),
            shift_weight,
            residues,
        }
    }
}

/// Write a curves JSON file.
pub fn write_curves_json(path: &Path, curves: &CurvesFile) -> Result<(), AppError> {
    let file = create(path)?;
    serde_json::to_writer_pretty(file, curves).map_err(|e| {
        AppError::new(ErrorKind::Internal, format!("Failed to write curves JSON: {e}"))
    })?;
    Ok(())
}

/// Read a curves JSON file.
#[cfg(test)]
pub fn read_curves_json(path: &Path) -> Result<CurvesFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!("Failed to open curves JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid curves JSON: {e}")))
}
