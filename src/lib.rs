//! `csp-titration` library crate.
//!
//! The binary (`csp`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - matching, series assembly and fitting are reusable on in-memory spectra

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod matching;
pub mod math;
pub mod models;
pub mod report;
pub mod series;
