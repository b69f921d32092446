//! Small dense linear least-squares solves.
//!
//! Every Levenberg–Marquardt step solves a damped normal-equation system
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr
//! ```
//!
//! with only three unknowns. Near a flat direction of the isotherm (e.g. a
//! saturated curve where Ka barely matters) `JᵀJ` is close to singular, so we
//! solve with SVD and a truncation tolerance rather than a plain inverse.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-12, 1e-10] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn singular_square_system_returns_minimum_norm_solution() {
        // Second column duplicates the first; SVD truncation still yields a finite answer.
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let y = DVector::from_row_slice(&[2.0, 2.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] + beta[1] - 2.0).abs() < 1e-10);
    }
}
