//! Multi-start fitting of the binding isotherm.
//!
//! Given one residue's perturbation curve:
//! - drop missing points and require at least `min_points`
//! - start Levenberg–Marquardt from each Ka in the start grid, with
//!   `ΔHG₀ = max(observed)` and `ΔH₀ = min(observed)` held fixed across starts
//! - discard starts that fail to converge
//! - keep the converged start with the lowest SSR
//!
//! Ka is optimized as `ln Ka` so every trial stays in the physical domain.
//! Starts and residues are independent and run in parallel; the keep-best
//! reduction happens after collection, so results do not depend on scheduling.

use rayon::prelude::*;

use crate::domain::{
    CspCurve, FitConfig, FitCurve, ResidueFit, RunWarning, SkipReason, SkippedResidue,
};
use crate::error::AppError;
use crate::fit::ka_grid::log_space;
use crate::math::{LmFailure, LmOptions, levenberg_marquardt, mean, r_squared, total_sum_of_squares};
use crate::models::{BindingParams, predict, sample_curve};

/// Fitting options shared by every residue in a run.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Initial Ka guesses, one LM attempt per value.
    pub ka_starts: Vec<f64>,
    /// Iteration cap per attempt.
    pub max_iterations: usize,
    /// Minimum number of non-missing points to attempt a fit.
    pub min_points: usize,
    /// Samples in the prediction curve.
    pub curve_points: usize,
}

impl FitOptions {
    pub fn from_config(config: &FitConfig) -> Result<Self, AppError> {
        Ok(Self {
            ka_starts: log_space(config.ka_min, config.ka_max, config.ka_starts)?,
            max_iterations: config.max_iterations,
            min_points: config.min_points.max(1),
            curve_points: config.curve_points,
        })
    }
}

impl Default for FitOptions {
    fn default() -> Self {
        let config = FitConfig::default();
        Self {
            ka_starts: log_space(config.ka_min, config.ka_max, config.ka_starts).unwrap_or_default(),
            max_iterations: config.max_iterations,
            min_points: config.min_points,
            curve_points: config.curve_points,
        }
    }
}

/// Result of fitting one residue.
#[derive(Debug, Clone)]
pub enum ResidueOutcome {
    Fitted { fit: ResidueFit, curve: FitCurve },
    Skipped(SkipReason),
}

/// All residues of a run, in input order.
#[derive(Debug, Clone, Default)]
pub struct FitBatch {
    pub fits: Vec<ResidueFit>,
    pub curves: Vec<FitCurve>,
    pub skipped: Vec<SkippedResidue>,
    pub warnings: Vec<RunWarning>,
}

#[derive(Debug, Clone)]
struct Attempt {
    idx: usize,
    params: BindingParams,
    ssr: f64,
}

/// Fit every curve (parallel over residues) and merge in input order.
pub fn fit_residues(curves: &[CspCurve], opts: &FitOptions) -> FitBatch {
    let outcomes: Vec<ResidueOutcome> = curves.par_iter().map(|c| fit_residue(c, opts)).collect();

    let mut batch = FitBatch::default();
    for (curve, outcome) in curves.iter().zip(outcomes) {
        match outcome {
            ResidueOutcome::Fitted { fit, curve } => {
                batch.fits.push(fit);
                batch.curves.push(curve);
            }
            ResidueOutcome::Skipped(reason) => {
                let warning = match &reason {
                    SkipReason::InsufficientData {
                        valid_points,
                        required,
                    } => RunWarning::InsufficientData {
                        residue: curve.residue.clone(),
                        valid_points: *valid_points,
                        required: *required,
                    },
                    SkipReason::NoConvergence { attempts } => RunWarning::FitTotalFailure {
                        residue: curve.residue.clone(),
                        attempts: *attempts,
                    },
                };
                log::warn!("{warning}");
                batch.warnings.push(warning);
                batch.skipped.push(SkippedResidue {
                    residue: curve.residue.clone(),
                    reason,
                });
            }
        }
    }
    batch
}

/// Fit one residue's curve.
pub fn fit_residue(curve: &CspCurve, opts: &FitOptions) -> ResidueOutcome {
    let points = curve.valid_points();
    if points.len() < opts.min_points {
        return ResidueOutcome::Skipped(SkipReason::InsufficientData {
            valid_points: points.len(),
            required: opts.min_points,
        });
    }

    let observed: Vec<f64> = points.iter().map(|&(_, _, d)| d).collect();
    let delta_hg0 = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let delta_h0 = observed.iter().copied().fold(f64::INFINITY, f64::min);

    let lm_opts = LmOptions {
        max_iterations: opts.max_iterations,
        ..LmOptions::default()
    };

    let attempts: Vec<Attempt> = opts
        .ka_starts
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &ka0)| {
            match run_attempt(&points, ka0, delta_hg0, delta_h0, &lm_opts) {
                Ok((params, ssr)) => Some(Attempt { idx, params, ssr }),
                Err(reason) => {
                    log::debug!(
                        "{}: start {idx} (Ka0={ka0:.3e}) discarded: {reason}",
                        curve.residue
                    );
                    None
                }
            }
        })
        .collect();

    // Deterministic selection: pick the minimum SSR; break ties by start index.
    let Some(best) = attempts
        .iter()
        .min_by(|a, b| a.ssr.total_cmp(&b.ssr).then(a.idx.cmp(&b.idx)))
    else {
        return ResidueOutcome::Skipped(SkipReason::NoConvergence {
            attempts: opts.ka_starts.len(),
        });
    };

    let tss = total_sum_of_squares(&observed);
    let fit = ResidueFit {
        residue: curve.residue.clone(),
        ka: best.params.ka,
        delta_hg: best.params.delta_hg,
        delta_h: best.params.delta_h,
        ssr: best.ssr,
        r_squared: r_squared(best.ssr, tss),
        is_outlier: false,
        starts_converged: attempts.len(),
        n_points: points.len(),
    };

    let hosts: Vec<f64> = points.iter().map(|&(h, _, _)| h).collect();
    let h_mean = mean(&hosts).unwrap_or(0.0);
    let g_min = points.iter().map(|&(_, g, _)| g).fold(f64::INFINITY, f64::min);
    let g_max = points.iter().map(|&(_, g, _)| g).fold(f64::NEG_INFINITY, f64::max);
    let (ratio, response) = sample_curve(&best.params, h_mean, g_min, g_max, opts.curve_points);

    ResidueOutcome::Fitted {
        fit,
        curve: FitCurve {
            residue: curve.residue.clone(),
            ratio,
            response,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AttemptFailure {
    Solver(LmFailure),
    NonPhysical,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Solver(e) => write!(f, "{e}"),
            AttemptFailure::NonPhysical => write!(f, "non-finite parameters at convergence"),
        }
    }
}

fn run_attempt(
    points: &[(f64, f64, f64)],
    ka0: f64,
    delta_hg0: f64,
    delta_h0: f64,
    lm_opts: &LmOptions,
) -> Result<(BindingParams, f64), AttemptFailure> {
    let residuals = |p: &[f64]| -> Vec<f64> {
        let params = BindingParams {
            ka: p[0].exp(),
            delta_hg: p[1],
            delta_h: p[2],
        };
        points
            .iter()
            .map(|&(h0, g0, y)| y - predict(&params, h0, g0))
            .collect()
    };

    let sol = levenberg_marquardt(residuals, &[ka0.ln(), delta_hg0, delta_h0], lm_opts)
        .map_err(AttemptFailure::Solver)?;

    let params = BindingParams {
        ka: sol.params[0].exp(),
        delta_hg: sol.params[1],
        delta_h: sol.params[2],
    };
    let physical = params.ka.is_finite()
        && params.ka > 0.0
        && params.delta_hg.is_finite()
        && params.delta_h.is_finite()
        && sol.ssr.is_finite();
    if !physical {
        return Err(AttemptFailure::NonPhysical);
    }

    Ok((params, sol.ssr))
}
