//! Shared domain types.
//!
//! These types are intentionally plain and serializable so they can be:
//!
//! - assembled per station by the harvest pipeline
//! - rendered into ISO 19115-2 documents
//! - exported to JSON for inspection

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;

use crate::error::AppError;

/// SOS protocol version spoken by every request.
pub const SOS_VERSION: &str = "1.0.0";

/// The SOS service a run talks to.
///
/// Built once from the configured URL. `with_operations` returns a new value
/// carrying the operations advertised by the capabilities document.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEndpoint {
    url: Url,
    version: String,
    /// Operation name -> advertised HTTP GET href (if any).
    operations: BTreeMap<String, Option<String>>,
}

impl ServiceEndpoint {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| AppError::usage(format!("Invalid service URL '{raw}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::usage(format!(
                "Service URL '{raw}' must use http or https."
            )));
        }
        if url.host_str().is_none() {
            return Err(AppError::usage(format!("Service URL '{raw}' has no host.")));
        }
        Ok(Self {
            url,
            version: SOS_VERSION.to_string(),
            operations: BTreeMap::new(),
        })
    }

    pub fn with_operations(&self, operations: BTreeMap<String, Option<String>>) -> Self {
        Self {
            operations,
            ..self.clone()
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn operations(&self) -> &BTreeMap<String, Option<String>> {
        &self.operations
    }

    /// GET href advertised for `operation`, falling back to the base URL.
    pub fn operation_href(&self, operation: &str) -> &str {
        self.operations
            .get(operation)
            .and_then(|href| href.as_deref())
            .unwrap_or(self.url.as_str())
    }

    /// `host[:port]`, used to name the output directory and files.
    pub fn server_name(&self) -> String {
        let host = self.url.host_str().unwrap_or("sos");
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

/// Geographic position in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub longitude: f64,
    pub latitude: f64,
}

/// A responsible party from the descriptor's contact section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub organization: Option<String>,
    pub country: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

/// A document linked from the descriptor's documentation section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub url: Option<String>,
    pub format: Option<String>,
}

/// Service-level descriptive metadata from the capabilities document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceMetadata {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
    pub keywords: Vec<String>,
}

/// An example GetObservation request for one variable in one format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservationLink {
    pub variable: String,
    /// Query-decoded URL with `&` escaped as `&amp;` (markup-safe).
    pub url: String,
    pub format_type: String,
    pub format_name: String,
}

/// The canonical per-station output of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRecord {
    pub identifier: String,
    pub position: Option<Position>,

    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub wmo_id: Option<String>,

    /// First classifier of each kind only; see `harvest::descriptor`.
    pub platform_type: Option<String>,
    pub parent_network: Option<String>,
    pub sponsor: Option<String>,

    /// Contact role (last segment of the role URI) -> contact.
    pub contacts: BTreeMap<String, Contact>,
    /// Document name -> document.
    pub documents: BTreeMap<String, Document>,

    /// Observed-parameter URIs and their short names (same order).
    pub variables: Vec<String>,
    pub variable_names: Vec<String>,

    /// Observation window advertised for the station's offering.
    pub starting: Option<DateTime<Utc>>,
    pub ending: Option<DateTime<Utc>>,
    /// Descriptor validity begin; the fetch time when the descriptor has none.
    pub begin_service_date: DateTime<Utc>,

    pub service: ServiceMetadata,
    pub response_formats: Vec<String>,
    pub download_formats: Vec<String>,
    /// `"<variable>-<format>"` -> example request.
    pub observation_links: BTreeMap<String, ObservationLink>,
}

/// A station that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub station: String,
    pub cause: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticLevel::Warning => write!(f, "WARN"),
            DiagnosticLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// One non-fatal problem noticed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub station: Option<String>,
    pub message: String,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and `.env`).
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub service_url: String,
    /// Explicit station universe; `None` means "every station offering".
    pub stations: Option<Vec<String>>,
    /// Keep only stations with an observation within this many days.
    pub active_station_days: Option<u32>,
    /// Width of the example GetObservation time window.
    pub getobs_req_hours: u32,
    pub response_formats: Vec<String>,

    pub output_dir: Option<PathBuf>,
    pub workers: usize,
    pub timeout_secs: u64,

    pub log_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
    pub verbose: bool,
    pub dry_run: bool,
}

impl HarvestConfig {
    /// Config with the defaults used by the CLI.
    pub fn for_service(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            stations: None,
            active_station_days: None,
            getobs_req_hours: DEFAULT_GETOBS_REQ_HOURS,
            response_formats: DEFAULT_RESPONSE_FORMATS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            output_dir: None,
            workers: DEFAULT_WORKERS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_csv: None,
            export_json: None,
            verbose: false,
            dry_run: false,
        }
    }
}

pub const DEFAULT_GETOBS_REQ_HOURS: u32 = 2;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RESPONSE_FORMATS: [&str; 2] = [
    "text/xml; subtype=\"om/1.0.0/profiles/ioos_sos/1.0\"",
    "text/csv",
];
