//! Synthetic titration generation for `csp demo` and tests.
//!
//! Each residue gets an anchor position, a saturated shift vector and a Ka.
//! In spectrum `i` the peak sits at `anchor + f_i * shift` (plus Gaussian
//! noise), where `f_i = HG / H0` is the bound fraction of the 1:1 isotherm at
//! that titration point. The weighted distance from the anchor is therefore
//! proportional to `f_i`, i.e. an exact isotherm with `ΔH = 0`.
//!
//! The anchor spectrum is labeled; follow-up spectra are unlabeled, shuffled,
//! and may drop peaks.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Concentrations, Coord, PeakRecord, Spectrum};
use crate::error::{AppError, ErrorKind};
use crate::models::complex_concentration;

const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// Typical Ka of well-behaved residues (1/M).
const BASE_KA: f64 = 1000.0;
/// Multiplier applied to deviant residues' Ka.
const DEVIANT_FACTOR: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub residues: usize,
    pub spectra: usize,
    pub seed: u64,
    /// Standard deviation of peak position noise (both axes).
    pub noise_sd: f64,
    /// Probability a residue's peak is absent from a follow-up spectrum.
    pub missing_prob: f64,
    /// Fraction of residues whose Ka is scaled by `DEVIANT_FACTOR`.
    pub deviant_fraction: f64,
    /// Constant host concentration (M).
    pub host: f64,
    /// Guest concentration of the last spectrum (M); guest rises linearly from 0.
    pub guest_max: f64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            residues: 40,
            spectra: 10,
            seed: 42,
            noise_sd: 0.002,
            missing_prob: 0.02,
            deviant_fraction: 0.1,
            host: 1e-3,
            guest_max: 5e-3,
        }
    }
}

/// Ground truth for one simulated residue.
#[derive(Debug, Clone, PartialEq)]
pub struct TrueResidue {
    pub label: String,
    pub ka: f64,
    pub anchor: Coord,
    pub shift: Coord,
    pub deviant: bool,
}

#[derive(Debug, Clone)]
pub struct SyntheticTitration {
    pub spectra: Vec<Spectrum>,
    pub concentrations: Concentrations,
    pub truth: Vec<TrueResidue>,
}

pub fn generate_titration(spec: &SyntheticSpec) -> Result<SyntheticTitration, AppError> {
    validate(spec)?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let noise = Normal::new(0.0, spec.noise_sd)
        .map_err(|e| AppError::new(ErrorKind::Internal, format!("Noise distribution error: {e}")))?;
    let ka_spread = Normal::new(0.0_f64, 0.1)
        .map_err(|e| AppError::new(ErrorKind::Internal, format!("Ka distribution error: {e}")))?;

    let truth: Vec<TrueResidue> = (0..spec.residues)
        .map(|i| {
            let aa = AMINO_ACIDS[rng.gen_range(0..AMINO_ACIDS.len())] as char;
            let deviant = rng.r#gen::<f64>() < spec.deviant_fraction;
            let mut ka = BASE_KA * ka_spread.sample(&mut rng).exp();
            if deviant {
                ka *= DEVIANT_FACTOR;
            }
            TrueResidue {
                label: format!("{aa}{}", i + 2),
                ka,
                anchor: Coord::new(rng.gen_range(6.5..10.0), rng.gen_range(105.0..130.0)),
                shift: Coord::new(
                    random_sign(&mut rng) * rng.gen_range(0.02..0.15),
                    random_sign(&mut rng) * rng.gen_range(0.1..0.8),
                ),
                deviant,
            }
        })
        .collect();

    let guest: Vec<f64> = (0..spec.spectra)
        .map(|i| spec.guest_max * i as f64 / (spec.spectra - 1) as f64)
        .collect();
    let host = vec![spec.host; spec.spectra];

    let mut spectra = Vec::with_capacity(spec.spectra);
    spectra.push(Spectrum {
        name: "t00".to_string(),
        peaks: truth
            .iter()
            .enumerate()
            .map(|(i, r)| peak(i as i64 + 1, r.anchor, Some(r.label.clone())))
            .collect(),
    });

    for (s, &g0) in guest.iter().enumerate().skip(1) {
        let mut coords = Vec::with_capacity(truth.len());
        for r in &truth {
            if rng.r#gen::<f64>() < spec.missing_prob {
                continue;
            }
            let bound = complex_concentration(spec.host, g0, r.ka) / spec.host;
            coords.push(Coord::new(
                r.anchor.x + bound * r.shift.x + noise.sample(&mut rng),
                r.anchor.y + bound * r.shift.y + noise.sample(&mut rng),
            ));
        }
        coords.shuffle(&mut rng);

        spectra.push(Spectrum {
            name: format!("t{s:02}"),
            peaks: coords
                .into_iter()
                .enumerate()
                .map(|(i, c)| peak(i as i64 + 1, c, None))
                .collect(),
        });
    }

    log::debug!(
        "synthetic titration: {} residues ({} deviant), {} spectra, seed {}",
        truth.len(),
        truth.iter().filter(|r| r.deviant).count(),
        spectra.len(),
        spec.seed
    );

    Ok(SyntheticTitration {
        spectra,
        concentrations: Concentrations { host, guest },
        truth,
    })
}

fn validate(spec: &SyntheticSpec) -> Result<(), AppError> {
    let usage = |msg: &str| -> Result<(), AppError> { Err(AppError::new(ErrorKind::Usage, msg)) };
    if spec.residues == 0 {
        return usage("Residue count must be > 0.");
    }
    if spec.spectra < 2 {
        return usage("A titration needs at least 2 spectra.");
    }
    if !(spec.noise_sd.is_finite() && spec.noise_sd >= 0.0) {
        return usage("Noise must be finite and >= 0.");
    }
    if !(0.0..1.0).contains(&spec.missing_prob) || !(0.0..=1.0).contains(&spec.deviant_fraction) {
        return usage("Invalid missing-peak or deviant-residue probability.");
    }
    if !(spec.host > 0.0 && spec.guest_max > 0.0 && spec.host.is_finite() && spec.guest_max.is_finite()) {
        return usage("Host and guest concentrations must be finite and > 0.");
    }
    Ok(())
}

fn random_sign(rng: &mut StdRng) -> f64 {
    if rng.gen_bool(0.5) { 1.0 } else { -1.0 }
}

fn peak(index: i64, c: Coord, label: Option<String>) -> PeakRecord {
    PeakRecord {
        index,
        coord1: c.x,
        coord2: c.y,
        flag: "0".to_string(),
        label,
        raw_line: String::new(),
    }
}
