//! Run-scoped diagnostics.
//!
//! Every recoverable problem (missing field, failed write, unknown format...)
//! is recorded here and surfaced to the caller at the end of the run. Entries
//! are mirrored to `tracing` as they are recorded.

use crate::domain::{Diagnostic, DiagnosticLevel};

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, station: Option<&str>, message: impl Into<String>) {
        self.record(DiagnosticLevel::Warning, station, message.into());
    }

    pub fn error(&mut self, station: Option<&str>, message: impl Into<String>) {
        self.record(DiagnosticLevel::Error, station, message.into());
    }

    fn record(&mut self, level: DiagnosticLevel, station: Option<&str>, message: String) {
        let station_label = station.unwrap_or("-");
        match level {
            DiagnosticLevel::Warning => tracing::warn!(station = station_label, "{message}"),
            DiagnosticLevel::Error => tracing::error!(station = station_label, "{message}"),
        }
        self.entries.push(Diagnostic {
            level,
            station: station.map(str::to_string),
            message,
        });
    }

    /// Append entries gathered elsewhere (e.g. by a worker) without logging
    /// them a second time.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}
