//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - generate the Ka start grid
//! - fit each residue from every start (parallel) and keep the best
//! - flag atypical Ka values across residues

pub mod fitter;
pub mod ka_grid;
pub mod outliers;

pub use fitter::*;
pub use ka_grid::*;
pub use outliers::*;
