//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the service endpoint and run configuration (`ServiceEndpoint`, `HarvestConfig`)
//! - the canonical per-station record (`StationRecord`) and its parts
//! - failures and diagnostics surfaced at the end of a run
//! - response-format presentation tables (`formats`) and timestamp helpers (`time`)

pub mod formats;
pub mod time;
pub mod types;

pub use types::*;
