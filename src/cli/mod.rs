//! Command-line parsing for the CSP titration analyser.
//!
//! Argument parsing and command dispatch stay separate from the matching and
//! fitting code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{AxisMapping, DEFAULT_SHIFT_WEIGHT};
use crate::io::DEFAULT_PEAK_EXTENSION;

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "csp",
    version,
    about = "Chemical shift perturbation titration analysis (1:1 binding fits)"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Match peak lists across a titration, fit Ka per residue and flag outliers.
    ///
    /// Without peak lists or `--dir`, an interactive picker is shown.
    Fit(FitArgs),
    /// Run the full analysis on a synthetic titration with known Ka values.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Peak-list files in titration order (first = labeled reference).
    #[arg(value_name = "PEAKLIST")]
    pub files: Vec<PathBuf>,

    /// Directory of peak lists, ordered by file name (natural number order).
    #[arg(long, conflicts_with = "files")]
    pub dir: Option<PathBuf>,

    /// Peak-list extension used with `--dir` and the picker.
    #[arg(long, default_value = DEFAULT_PEAK_EXTENSION)]
    pub ext: String,

    /// Host concentration per spectrum (comma-separated).
    #[arg(long, value_delimiter = ',', num_args = 1.., conflicts_with = "conc")]
    pub host: Vec<f64>,

    /// Guest concentration per spectrum (comma-separated).
    #[arg(long, value_delimiter = ',', num_args = 1.., conflicts_with = "conc")]
    pub guest: Vec<f64>,

    /// CSV file with `host` and `guest` columns, one row per spectrum.
    #[arg(long, value_name = "CSV")]
    pub conc: Option<PathBuf>,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Number of residues to simulate.
    #[arg(long, default_value_t = 40)]
    pub residues: usize,

    /// Number of spectra (including the reference).
    #[arg(long, default_value_t = 10)]
    pub spectra: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Peak position noise (standard deviation, both axes).
    #[arg(long, default_value_t = 0.002)]
    pub noise: f64,

    /// Probability that a peak is missing from a non-reference spectrum.
    #[arg(long, default_value_t = 0.02)]
    pub missing: f64,

    /// Fraction of residues simulated with a strongly deviating Ka.
    #[arg(long, default_value_t = 0.1)]
    pub deviant: f64,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

/// Options shared by `fit` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct AnalysisArgs {
    /// Which peak-list coordinate becomes the first (unweighted) axis.
    #[arg(long, value_enum, default_value_t = AxisMapping::Ab)]
    pub axes: AxisMapping,

    /// Weight applied to the second axis in the perturbation distance.
    #[arg(long, default_value_t = DEFAULT_SHIFT_WEIGHT)]
    pub weight: f64,

    /// Smallest Ka starting value (1/M).
    #[arg(long, default_value_t = 1.0)]
    pub ka_min: f64,

    /// Largest Ka starting value (1/M).
    #[arg(long, default_value_t = 1e5)]
    pub ka_max: f64,

    /// Number of log-spaced Ka starts.
    #[arg(long, default_value_t = 20)]
    pub starts: usize,

    /// Iteration cap per start.
    #[arg(long, default_value_t = 1000)]
    pub max_iter: usize,

    /// Minimum non-missing points required to fit a residue.
    #[arg(long, default_value_t = 3)]
    pub min_points: usize,

    /// IQR multiplier for outlier fences.
    #[arg(long, default_value_t = 1.5)]
    pub iqr_k: f64,

    /// Samples per fitted curve in the curves export.
    #[arg(long, default_value_t = 100)]
    pub curve_points: usize,

    /// Export per-residue results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export matcher conflicts to CSV.
    #[arg(long = "export-conflicts")]
    pub export_conflicts: Option<PathBuf>,

    /// Export fitted curves (parameters + sampled prediction) to JSON.
    #[arg(long = "export-curves")]
    pub export_curves: Option<PathBuf>,
}
