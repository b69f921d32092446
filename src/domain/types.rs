//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - passed between the matcher, assembler and fitter without conversion
//! - exported to JSON/CSV
//! - built directly from in-memory fixtures in tests

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default weight applied to the second coordinate in the perturbation distance.
pub const DEFAULT_SHIFT_WEIGHT: f64 = 0.2;

/// How the two coordinate columns of a peak list map onto `(coord1, coord2)`.
///
/// Peak-list exports differ in column order; the core never guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AxisMapping {
    /// `coordA -> coord1`, `coordB -> coord2`.
    Ab,
    /// `coordB -> coord1`, `coordA -> coord2`.
    Ba,
}

impl AxisMapping {
    pub fn apply(self, coord_a: f64, coord_b: f64) -> (f64, f64) {
        match self {
            AxisMapping::Ab => (coord_a, coord_b),
            AxisMapping::Ba => (coord_b, coord_a),
        }
    }
}

/// A 2D peak position after axis mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn euclidean(self, other: Coord) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// One parsed peak.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakRecord {
    pub index: i64,
    pub coord1: f64,
    pub coord2: f64,
    pub flag: String,
    pub label: Option<String>,
    pub raw_line: String,
}

impl PeakRecord {
    pub fn coord(&self) -> Coord {
        Coord::new(self.coord1, self.coord2)
    }
}

/// One measurement of the titration series.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub name: String,
    pub peaks: Vec<PeakRecord>,
}

impl Spectrum {
    /// A spectrum counts as labeled when at least one peak carries a label.
    pub fn is_labeled(&self) -> bool {
        self.peaks.iter().any(|p| p.label.is_some())
    }
}

/// A reference label that ended up owning an unlabeled peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMatch {
    pub reference_label: String,
    /// Position of the peak in the unlabeled slice handed to the matcher.
    pub unlabeled: usize,
    pub distance: f64,
}

/// One reference that chose a contested column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contender {
    pub label: String,
    pub distance: f64,
}

/// An unlabeled column chosen as nearest neighbour by two or more references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictGroup {
    pub unlabeled: usize,
    /// Contenders in reference input order.
    pub contenders: Vec<Contender>,
    pub winner: String,
}

impl ConflictGroup {
    pub fn size(&self) -> usize {
        self.contenders.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub references: usize,
    pub unlabeled: usize,
    pub unique_matches: usize,
    pub conflicts: usize,
    pub total_matches: usize,
}

/// Output of one matcher call.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub unconflicted: Vec<ResolvedMatch>,
    pub resolved: Vec<ResolvedMatch>,
    pub conflicts: Vec<ConflictGroup>,
    pub summary: MatchSummary,
}

impl MatchOutcome {
    /// All final matches: unconflicted first, then conflict winners.
    pub fn matches(&self) -> impl Iterator<Item = &ResolvedMatch> {
        self.unconflicted.iter().chain(self.resolved.iter())
    }
}

/// Per-residue coordinate track across the series (index 0 is the anchor).
#[derive(Debug, Clone)]
pub struct ResidueTrack {
    pub label: String,
    pub coords: Vec<Option<Coord>>,
}

/// Residue tracks in anchor order.
#[derive(Debug, Clone, Default)]
pub struct TitrationSeries {
    pub spectra: Vec<String>,
    pub tracks: Vec<ResidueTrack>,
}

impl TitrationSeries {
    pub fn track(&self, label: &str) -> Option<&ResidueTrack> {
        self.tracks.iter().find(|t| t.label == label)
    }
}

/// Host/guest totals for each spectrum, positionally aligned with the series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Concentrations {
    pub host: Vec<f64>,
    pub guest: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CspPoint {
    pub host: f64,
    pub guest: f64,
    pub distance: Option<f64>,
}

/// Perturbation distance vs concentration for one residue.
#[derive(Debug, Clone, PartialEq)]
pub struct CspCurve {
    pub residue: String,
    pub points: Vec<CspPoint>,
}

impl CspCurve {
    /// `(host, guest, distance)` for every non-missing point.
    pub fn valid_points(&self) -> Vec<(f64, f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.distance.map(|d| (p.host, p.guest, d)))
            .collect()
    }
}

/// Best fit of the binding isotherm for one residue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidueFit {
    pub residue: String,
    pub ka: f64,
    pub delta_hg: f64,
    pub delta_h: f64,
    pub ssr: f64,
    pub r_squared: f64,
    pub is_outlier: bool,
    /// Number of starts (out of the configured count) that converged.
    pub starts_converged: usize,
    /// Number of non-missing points used in the fit.
    pub n_points: usize,
}

impl ResidueFit {
    pub fn kd(&self) -> f64 {
        1.0 / self.ka
    }
}

/// Sampled model prediction for plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitCurve {
    pub residue: String,
    /// `guest / host` at each sample.
    pub ratio: Vec<f64>,
    pub response: Vec<f64>,
}

/// Why a residue has no entry in the result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientData { valid_points: usize, required: usize },
    NoConvergence { attempts: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientData {
                valid_points,
                required,
            } => write!(f, "insufficient data ({valid_points} valid points, need {required})"),
            SkipReason::NoConvergence { attempts } => {
                write!(f, "no start converged ({attempts} attempts)")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedResidue {
    pub residue: String,
    pub reason: SkipReason,
}

/// A recoverable problem. The run continues; these are reported at the end.
#[derive(Debug, Clone, PartialEq)]
pub enum RunWarning {
    MalformedRecord {
        source: String,
        line: usize,
        reason: String,
    },
    DuplicateLabel {
        spectrum: String,
        label: String,
    },
    MismatchedSeriesLength {
        spectra: usize,
        host: usize,
        guest: usize,
        used: usize,
    },
    InsufficientData {
        residue: String,
        valid_points: usize,
        required: usize,
    },
    FitTotalFailure {
        residue: String,
        attempts: usize,
    },
}

impl RunWarning {
    /// Residue the warning refers to, if any.
    pub fn residue(&self) -> Option<&str> {
        match self {
            RunWarning::InsufficientData { residue, .. }
            | RunWarning::FitTotalFailure { residue, .. } => Some(residue),
            _ => None,
        }
    }
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::MalformedRecord {
                source,
                line,
                reason,
            } => write!(f, "{source}:{line}: skipped malformed record ({reason})"),
            RunWarning::DuplicateLabel { spectrum, label } => write!(
                f,
                "{spectrum}: duplicate label '{label}' ignored (first occurrence kept)"
            ),
            RunWarning::MismatchedSeriesLength {
                spectra,
                host,
                guest,
                used,
            } => write!(
                f,
                "series length mismatch (spectra={spectra}, host={host}, guest={guest}); truncated to {used}"
            ),
            RunWarning::InsufficientData {
                residue,
                valid_points,
                required,
            } => write!(
                f,
                "{residue}: skipped, {valid_points} valid points (need {required})"
            ),
            RunWarning::FitTotalFailure { residue, attempts } => {
                write!(f, "{residue}: skipped, none of {attempts} starts converged")
            }
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub axes: AxisMapping,
    /// Weight `w` on the second coordinate in `sqrt((dx^2 + (w*dy)^2) / 2)`.
    pub shift_weight: f64,

    pub ka_min: f64,
    pub ka_max: f64,
    pub ka_starts: usize,
    pub max_iterations: usize,
    pub min_points: usize,

    pub iqr_factor: f64,
    pub curve_points: usize,

    pub export_results: Option<PathBuf>,
    pub export_conflicts: Option<PathBuf>,
    pub export_curves: Option<PathBuf>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            axes: AxisMapping::Ab,
            shift_weight: DEFAULT_SHIFT_WEIGHT,
            ka_min: 1.0,
            ka_max: 1e5,
            ka_starts: 20,
            max_iterations: 1000,
            min_points: 3,
            iqr_factor: 1.5,
            curve_points: 100,
            export_results: None,
            export_conflicts: None,
            export_curves: None,
        }
    }
}
