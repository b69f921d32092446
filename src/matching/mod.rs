//! Peak correspondence between a labeled reference spectrum and unlabeled peaks.

pub mod matcher;

pub use matcher::*;
