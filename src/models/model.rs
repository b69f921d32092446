//! 1:1 host–guest binding isotherm.
//!
//! For totals `H0`, `G0` and association constant `Ka`, the complex
//! concentration is the smaller root of `HG² − S·HG + G0·H0 = 0` with
//! `S = G0 + H0 + 1/Ka`:
//!
//! ```text
//! HG = 0.5 * (S − sqrt(S² − 4·G0·H0))
//! ```
//!
//! The observed response is the population-weighted average of the free-host
//! and complex signals:
//!
//! ```text
//! response = (ΔH·H + ΔHG·HG) / (H + HG),   H = H0 − HG
//! ```
//!
//! Numerical notes:
//! - For weak binding (`1/Ka ≫ G0, H0`) the textbook root subtracts two nearly
//!   equal numbers. We use the equivalent `HG = 2·G0·H0 / (S + sqrt(S² − 4·G0·H0))`,
//!   which has no cancellation.
//! - The discriminant is clamped at zero to absorb rounding when `G0 ≈ H0` and
//!   binding is very tight.

/// Fitted isotherm parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingParams {
    pub ka: f64,
    pub delta_hg: f64,
    pub delta_h: f64,
}

/// Complex concentration `HG` for totals `h0`, `g0`.
pub fn complex_concentration(h0: f64, g0: f64, ka: f64) -> f64 {
    if h0 <= 0.0 || g0 <= 0.0 {
        return 0.0;
    }
    let s = g0 + h0 + 1.0 / ka;
    let disc = (s * s - 4.0 * g0 * h0).max(0.0);
    2.0 * g0 * h0 / (s + disc.sqrt())
}

/// Predicted response at `(h0, g0)`.
pub fn predict(params: &BindingParams, h0: f64, g0: f64) -> f64 {
    let hg = complex_concentration(h0, g0, params.ka);
    let h = h0 - hg;
    let total = h + hg;
    if total <= 0.0 {
        return params.delta_h;
    }
    (params.delta_h * h + params.delta_hg * hg) / total
}

/// Sample the fitted curve at `n` evenly spaced guest concentrations across
/// `[g_min, g_max]`, at a fixed host concentration.
///
/// Returns `(guest/host ratio, response)` pairs.
pub fn sample_curve(
    params: &BindingParams,
    h0: f64,
    g_min: f64,
    g_max: f64,
    n: usize,
) -> (Vec<f64>, Vec<f64>) {
    let n = n.max(2);
    let mut ratio = Vec::with_capacity(n);
    let mut response = Vec::with_capacity(n);

    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let g0 = g_min + u * (g_max - g_min);
        ratio.push(if h0 > 0.0 { g0 / h0 } else { 0.0 });
        response.push(predict(params, h0, g0));
    }

    (ratio, response)
}
