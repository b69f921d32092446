//! Mathematical utilities: linear solves, Levenberg–Marquardt, statistics.

pub mod lm;
pub mod ols;
pub mod stats;

pub use lm::*;
pub use ols::*;
pub use stats::*;
