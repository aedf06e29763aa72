//! Filesystem outputs.
//!
//! - rendered documents, one per station (`output`)
//! - failure/diagnostic CSV log and JSON record export (`export`)

pub mod export;
pub mod output;

pub use export::*;
pub use output::*;
