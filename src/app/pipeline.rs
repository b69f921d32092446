//! Shared analysis pipeline used by `csp fit` and `csp demo`.
//!
//! source -> series assembly (matching) -> CSP curves -> per-residue fits ->
//! IQR outlier flags
//!
//! Front-ends only decide where spectra and concentrations come from and how
//! the output is presented.

use crate::domain::{Concentrations, CspCurve, FitConfig, RunWarning};
use crate::error::{AppError, ErrorKind};
use crate::fit::{FitBatch, FitOptions, IqrBounds, fit_residues, flag_outliers};
use crate::io::SpectrumSource;
use crate::series::{AssembledSeries, assemble_series, build_curves};

/// All computed outputs of a single analysis run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub source: String,
    pub assembled: AssembledSeries,
    pub curves: Vec<CspCurve>,
    /// Fits carry their final outlier flags.
    pub batch: FitBatch,
    pub bounds: Option<IqrBounds>,
    /// Every recoverable issue of the run, in pipeline order.
    pub warnings: Vec<RunWarning>,
}

impl RunOutput {
    pub fn spectra(&self) -> &[String] {
        &self.assembled.series.spectra
    }

    pub fn outliers(&self) -> usize {
        self.batch.fits.iter().filter(|f| f.is_outlier).count()
    }
}

/// Check config values the fitter and assembler rely on.
pub fn validate_config(config: &FitConfig) -> Result<(), AppError> {
    if !(config.shift_weight.is_finite() && config.shift_weight >= 0.0) {
        return Err(AppError::new(
            ErrorKind::Usage,
            format!("--weight must be finite and >= 0 (got {}).", config.shift_weight),
        ));
    }
    if !(config.iqr_factor.is_finite() && config.iqr_factor >= 0.0) {
        return Err(AppError::new(
            ErrorKind::Usage,
            format!("--iqr-k must be finite and >= 0 (got {}).", config.iqr_factor),
        ));
    }
    if config.min_points == 0 {
        return Err(AppError::new(ErrorKind::Usage, "--min-points must be at least 1."));
    }
    Ok(())
}

/// Execute the full analysis and return the computed outputs.
pub fn run_analysis(
    source: &dyn SpectrumSource,
    conc: &Concentrations,
    config: &FitConfig,
) -> Result<RunOutput, AppError> {
    validate_config(config)?;
    let opts = FitOptions::from_config(config)?;

    // 1) Load spectra.
    let loaded = source.spectra()?;
    log::info!("{}: {} spectra", source.describe(), loaded.spectra.len());
    let mut warnings = loaded.warnings;

    // 2) Match every spectrum against the labeled anchor.
    let assembled = assemble_series(&loaded.spectra)?;
    warnings.extend(assembled.warnings.iter().cloned());

    // 3) Perturbation curves (truncated to the shortest input).
    let (curves, mismatch) = build_curves(&assembled.series, conc, config.shift_weight);
    warnings.extend(mismatch);

    // 4) Fit each residue, then screen Ka across residues.
    let mut batch = fit_residues(&curves, &opts);
    warnings.extend(batch.warnings.iter().cloned());
    let bounds = flag_outliers(&mut batch.fits, config.iqr_factor);

    log::info!(
        "fitted {} of {} residues ({} skipped)",
        batch.fits.len(),
        curves.len(),
        batch.skipped.len()
    );

    Ok(RunOutput {
        source: source.describe(),
        assembled,
        curves,
        batch,
        bounds,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PeakRecord, Spectrum};
    use crate::io::MemorySource;

    fn peak(index: i64, x: f64, y: f64, label: Option<&str>) -> PeakRecord {
        PeakRecord {
            index,
            coord1: x,
            coord2: y,
            flag: "0".into(),
            label: label.map(str::to_string),
            raw_line: String::new(),
        }
    }

    #[test]
    fn invalid_weight_is_a_usage_error() {
        let config = FitConfig {
            shift_weight: -1.0,
            ..FitConfig::default()
        };
        let source = MemorySource::new("mem", Vec::new());
        let err = run_analysis(&source, &Concentrations::default(), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn empty_source_is_a_data_error() {
        let source = MemorySource::new("mem", Vec::new());
        let err = run_analysis(&source, &Concentrations::default(), &FitConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn short_series_skips_every_residue_with_warnings() {
        let spectra = vec![
            Spectrum {
                name: "t0".into(),
                peaks: vec![peak(1, 8.0, 120.0, Some("A"))],
            },
            Spectrum {
                name: "t1".into(),
                peaks: vec![peak(1, 8.01, 120.0, None)],
            },
        ];
        let conc = Concentrations {
            host: vec![1e-3, 1e-3],
            guest: vec![0.0, 1e-3],
        };
        let out = run_analysis(&MemorySource::new("mem", spectra), &conc, &FitConfig::default()).unwrap();
        assert!(out.batch.fits.is_empty());
        assert!(out.bounds.is_none());
        assert_eq!(out.batch.skipped.len(), 1);
        assert!(matches!(
            out.warnings.as_slice(),
            [RunWarning::InsufficientData { valid_points: 2, required: 3, .. }]
        ));
        assert_eq!(out.spectra(), ["t0".to_string(), "t1".to_string()]);
    }
}
