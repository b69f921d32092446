//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - parsed peaks and spectra (`PeakRecord`, `Spectrum`, `AxisMapping`)
//! - matcher outputs (`ResolvedMatch`, `ConflictGroup`, `MatchOutcome`)
//! - series and curve data (`TitrationSeries`, `CspCurve`, `Concentrations`)
//! - fit outputs and the recoverable-warning taxonomy (`ResidueFit`, `RunWarning`)

pub mod types;

pub use types::*;
