//! Input/output helpers.
//!
//! - peak-list parsing (`peaks`)
//! - spectrum sources: files, directories, memory (`source`)
//! - host/guest concentrations (`concentrations`)
//! - CSV exports (`export`)
//! - curves JSON read/write (`curve`)

pub mod concentrations;
pub mod curve;
pub mod export;
pub mod peaks;
pub mod source;

pub use concentrations::*;
pub use curve::*;
pub use export::*;
pub use peaks::*;
pub use source::*;
