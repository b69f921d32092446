//! Titration-series assembly: residue tracks and perturbation curves.

pub mod assembler;

pub use assembler::*;
