//! Station metadata harvesting.
//!
//! - `capabilities`: station universe + per-offering formats and windows
//! - `negotiate`: DescribeSensor format fallback
//! - `dialect` / `descriptor`: SensorML field extraction
//! - `fetcher`: per-station fetch, parse and enrich (parallel)
//! - `active`: recency filter
//! - `links`: example GetObservation requests

pub mod active;
pub mod capabilities;
pub mod descriptor;
pub mod diagnostics;
pub mod dialect;
pub mod fetcher;
pub mod links;
pub mod negotiate;

pub use active::filter_active;
pub use capabilities::{CapabilitiesSnapshot, Offering, ResolvedCapabilities, resolve};
pub use descriptor::{DescriptorDocument, DescriptorError, ParsedDescriptor};
pub use diagnostics::Diagnostics;
pub use dialect::DescriptorDialect;
pub use fetcher::{FetchOptions, FetchOutput, StationOutcome, fetch_all, fetch_station};
pub use links::build_links;
pub use negotiate::{DescriptorNotFound, fetch_descriptor};
