//! Reporting utilities: run summary, result tables, conflicts and warnings.

pub mod format;

pub use format::*;
