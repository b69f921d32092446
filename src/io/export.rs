//! CSV exports of fit results and matcher conflicts.
//!
//! Both writers are generic over `Write` so the same code backs `--export`
//! files and in-memory buffers.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::ResidueFit;
use crate::error::{AppError, ErrorKind};
use crate::series::SpectrumMatches;

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    residue: &'a str,
    ka: f64,
    kd: f64,
    delta_hg: f64,
    delta_h: f64,
    ssr: f64,
    r_squared: f64,
    outlier: bool,
    n_points: usize,
    starts_converged: usize,
}

#[derive(Debug, Serialize)]
struct ConflictRow<'a> {
    spectrum: &'a str,
    position: usize,
    peak_index: Option<i64>,
    group_size: usize,
    contender: &'a str,
    distance: f64,
    winner: bool,
}

/// Write per-residue fit results as CSV.
pub fn write_results<W: Write>(writer: W, fits: &[ResidueFit]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(writer);
    for fit in fits {
        w.serialize(ResultRow {
            residue: &fit.residue,
            ka: fit.ka,
            kd: fit.kd(),
            delta_hg: fit.delta_hg,
            delta_h: fit.delta_h,
            ssr: fit.ssr,
            r_squared: fit.r_squared,
            outlier: fit.is_outlier,
            n_points: fit.n_points,
            starts_converged: fit.starts_converged,
        })
        .map_err(|e| export_error("results", e))?;
    }
    w.flush().map_err(|e| export_error("results", e))?;
    Ok(())
}

/// Write one row per conflict contender, across all matched spectra.
pub fn write_conflicts<W: Write>(writer: W, matches: &[SpectrumMatches]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(writer);
    for sm in matches {
        for group in &sm.outcome.conflicts {
            for c in &group.contenders {
                w.serialize(ConflictRow {
                    spectrum: &sm.spectrum,
                    position: sm.position,
                    peak_index: sm.peak_index(group.unlabeled),
                    group_size: group.size(),
                    contender: &c.label,
                    distance: c.distance,
                    winner: c.label == group.winner,
                })
                .map_err(|e| export_error("conflicts", e))?;
            }
        }
    }
    w.flush().map_err(|e| export_error("conflicts", e))?;
    Ok(())
}

pub fn write_results_csv(path: &Path, fits: &[ResidueFit]) -> Result<(), AppError> {
    write_results(create(path)?, fits)
}

pub fn write_conflicts_csv(path: &Path, matches: &[SpectrumMatches]) -> Result<(), AppError> {
    write_conflicts(create(path)?, matches)
}

pub(crate) fn create(path: &Path) -> Result<File, AppError> {
    File::create(path).map_err(|e| {
        AppError::new(
            ErrorKind::Internal,
            format!("Failed to create '{}': {e}", path.display()),
        )
    })
}

fn export_error(what: &str, e: impl std::fmt::Display) -> AppError {
    AppError::new(ErrorKind::Internal, format!("Failed to write {what} export: {e}"))
}
