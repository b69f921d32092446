//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ r_i(p)²` for a residual function `r: R^n -> R^m`. The Jacobian
//! is estimated with forward differences, and each step solves the
//! Marquardt-scaled system
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = −Jᵀr
//! ```
//!
//! via [`solve_least_squares`]. λ shrinks after an accepted step and grows after
//! a rejected one.
//!
//! Termination:
//! - relative SSR reduction of an accepted step `<= ftol`
//! - step length `<= xtol * (|p| + xtol)`
//! - gradient max-norm `<= gtol`
//! - λ exceeding its ceiling (no descent direction left at the current point)
//!
//! Every iteration, accepted or not, counts towards `max_iterations`; running
//! out is reported as [`LmFailure::IterationLimit`].

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

const INITIAL_LAMBDA: f64 = 1e-3;
const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e12;
const DIAG_FLOOR: f64 = 1e-12;

/// Relative forward-difference step (√ε).
const FD_STEP: f64 = 1.490_116_119_384_765_6e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1.49e-8,
            xtol: 1.49e-8,
            gtol: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LmSolution {
    pub params: Vec<f64>,
    pub ssr: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmFailure {
    /// Residuals are not finite at the initial guess.
    NonFiniteStart,
    /// The Jacobian could not be evaluated (non-finite differences).
    NonFiniteJacobian,
    /// `max_iterations` reached without meeting a termination criterion.
    IterationLimit,
}

impl std::fmt::Display for LmFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LmFailure::NonFiniteStart => write!(f, "non-finite residuals at the initial guess"),
            LmFailure::NonFiniteJacobian => write!(f, "non-finite Jacobian"),
            LmFailure::IterationLimit => write!(f, "iteration limit reached"),
        }
    }
}

/// Run Levenberg–Marquardt from `initial`.
pub fn levenberg_marquardt<F>(
    residuals: F,
    initial: &[f64],
    opts: &LmOptions,
) -> Result<LmSolution, LmFailure>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = initial.len();
    let mut p = initial.to_vec();
    let mut r = residuals(&p);
    if !all_finite(&r) || !all_finite(&p) {
        return Err(LmFailure::NonFiniteStart);
    }
    let mut ssr = sum_sq(&r);
    let mut lambda = INITIAL_LAMBDA;

    for iteration in 1..=opts.max_iterations {
        let jac = jacobian(&residuals, &p, &r).ok_or(LmFailure::NonFiniteJacobian)?;
        let jt = jac.transpose();
        let gradient = &jt * DVector::from_column_slice(&r);

        if gradient.amax() <= opts.gtol {
            return Ok(LmSolution { params: p, ssr, iterations: iteration });
        }

        let mut a = &jt * &jac;
        for i in 0..n {
            a[(i, i)] += lambda * a[(i, i)].max(DIAG_FLOOR);
        }

        let Some(step) = solve_least_squares(&a, &(-&gradient)) else {
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                return Ok(LmSolution { params: p, ssr, iterations: iteration });
            }
            continue;
        };

        let p_norm = p.iter().map(|v| v * v).sum::<f64>().sqrt();
        let step_small = step.norm() <= opts.xtol * (p_norm + opts.xtol);

        let trial: Vec<f64> = p.iter().zip(step.iter()).map(|(a, b)| a + b).collect();
        let r_trial = residuals(&trial);
        let ssr_trial = if all_finite(&r_trial) {
            sum_sq(&r_trial)
        } else {
            f64::INFINITY
        };

        if ssr_trial < ssr {
            let reduction = (ssr - ssr_trial) / ssr;
            p = trial;
            r = r_trial;
            ssr = ssr_trial;
            lambda = (lambda / 10.0).max(MIN_LAMBDA);

            if reduction <= opts.ftol || step_small || ssr == 0.0 {
                return Ok(LmSolution { params: p, ssr, iterations: iteration });
            }
        } else {
            if step_small {
                return Ok(LmSolution { params: p, ssr, iterations: iteration });
            }
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                return Ok(LmSolution { params: p, ssr, iterations: iteration });
            }
        }
    }

    Err(LmFailure::IterationLimit)
}

fn jacobian<F>(residuals: &F, p: &[f64], r0: &[f64]) -> Option<DMatrix<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let m = r0.len();
    let mut jac = DMatrix::<f64>::zeros(m, p.len());
    let mut shifted = p.to_vec();

    for j in 0..p.len() {
        let h = FD_STEP * p[j].abs().max(1.0);
        shifted[j] = p[j] + h;
        let r = residuals(&shifted);
        shifted[j] = p[j];

        if r.len() != m {
            return None;
        }
        for i in 0..m {
            let d = (r[i] - r0[i]) / h;
            if !d.is_finite() {
                return None;
            }
            jac[(i, j)] = d;
        }
    }

    Some(jac)
}

fn sum_sq(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp_data() -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..12).map(|i| i as f64 * 0.25).collect();
        let y = x.iter().map(|&t| 2.5 * (-1.3 * t).exp()).collect();
        (x, y)
    }

    #[test]
    fn recovers_exponential_decay() {
        let (x, y) = exp_data();
        let residuals = |p: &[f64]| -> Vec<f64> {
            x.iter()
                .zip(y.iter())
                .map(|(&t, &yi)| yi - p[0] * (-p[1] * t).exp())
                .collect()
        };

        let sol = levenberg_marquardt(residuals, &[1.0, 0.5], &LmOptions::default()).unwrap();
        assert!((sol.params[0] - 2.5).abs() < 1e-6, "a={}", sol.params[0]);
        assert!((sol.params[1] - 1.3).abs() < 1e-6, "b={}", sol.params[1]);
        assert!(sol.ssr < 1e-12);
    }

    #[test]
    fn iteration_cap_is_reported_as_failure() {
        let (x, y) = exp_data();
        let residuals = |p: &[f64]| -> Vec<f64> {
            x.iter()
                .zip(y.iter())
                .map(|(&t, &yi)| yi - p[0] * (-p[1] * t).exp())
                .collect()
        };
        let opts = LmOptions {
            max_iterations: 1,
            ..LmOptions::default()
        };

        let err = levenberg_marquardt(residuals, &[1.0, 0.5], &opts).unwrap_err();
        assert_eq!(err, LmFailure::IterationLimit);
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let residuals = |_: &[f64]| vec![f64::NAN, 1.0];
        let err = levenberg_marquardt(residuals, &[1.0], &LmOptions::default()).unwrap_err();
        assert_eq!(err, LmFailure::NonFiniteStart);
    }
}
