//! Run exports: the failure/diagnostic CSV log and the JSON record dump.
//!
//! Both are meant for spreadsheets and downstream scripts, not for humans
//! reading a terminal (see `report` for that).

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Diagnostic, FailureRecord, StationRecord};
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct LogRow<'a> {
    kind: &'a str,
    station: &'a str,
    message: &'a str,
}

/// Write one row per failed station and per diagnostic.
///
/// Columns: `kind,station,message`, with `kind` one of `failure`, `warning`,
/// `error`. Returns the number of rows written.
pub fn write_log_csv(
    path: &Path,
    failures: &[FailureRecord],
    diagnostics: &[Diagnostic],
) -> Result<usize, AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::runtime(format!("Failed to create log CSV '{}': {e}", path.display()))
    })?;

    let failure_rows = failures.iter().map(|f| LogRow {
        kind: "failure",
        station: &f.station,
        message: &f.cause,
    });
    let diagnostic_rows = diagnostics.iter().map(|d| LogRow {
        kind: match d.level {
            crate::domain::DiagnosticLevel::Warning => "warning",
            crate::domain::DiagnosticLevel::Error => "error",
        },
        station: d.station.as_deref().unwrap_or(""),
        message: &d.message,
    });

    let mut rows = 0;
    for row in failure_rows.chain(diagnostic_rows) {
        writer
            .serialize(row)
            .map_err(|e| AppError::runtime(format!("Failed to write log CSV row: {e}")))?;
        rows += 1;
    }
    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush log CSV: {e}")))?;
    Ok(rows)
}

/// Shape of the JSON export.
#[derive(Debug, Serialize)]
pub struct RunExport<'a> {
    pub service_url: &'a str,
    pub generated: DateTime<Utc>,
    pub universe_size: usize,
    pub records: &'a [StationRecord],
    pub failures: &'a [FailureRecord],
}

pub fn write_records_json(path: &Path, export: &RunExport<'_>) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::runtime(format!("Failed to create JSON export '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, export)
        .map_err(|e| AppError::runtime(format!("Failed to write JSON export: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::domain::{DiagnosticLevel, ServiceMetadata};

    #[test]
    fn log_csv_lists_failures_then_diagnostics() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.csv");
        let failures = vec![FailureRecord {
            station: "urn:ioos:station:x:2".to_string(),
            cause: "no usable descriptor, tried 2 formats".to_string(),
        }];
        let diagnostics = vec![Diagnostic {
            level: DiagnosticLevel::Warning,
            station: None,
            message: "station universe is empty".to_string(),
        }];

        let rows = write_log_csv(&path, &failures, &diagnostics).unwrap();
        assert_eq!(rows, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "kind,station,message");
        assert_eq!(
            lines[1],
            "failure,urn:ioos:station:x:2,\"no usable descriptor, tried 2 formats\""
        );
        assert_eq!(lines[2], "warning,,station universe is empty");
    }

    #[test]
    fn json_export_round_trips_through_serde_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("records.json");
        let generated = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let records = vec![StationRecord {
            identifier: "urn:ioos:station:x:1".to_string(),
            position: None,
            short_name: Some("Station 1".to_string()),
            long_name: None,
            wmo_id: None,
            platform_type: None,
            parent_network: None,
            sponsor: None,
            contacts: Default::default(),
            documents: Default::default(),
            variables: Vec::new(),
            variable_names: Vec::new(),
            starting: None,
            ending: None,
            begin_service_date: generated,
            service: ServiceMetadata {
                title: None,
                abstract_: Some("about".to_string()),
                keywords: Vec::new(),
            },
            response_formats: Vec::new(),
            download_formats: Vec::new(),
            observation_links: Default::default(),
        }];
        let export = RunExport {
            service_url: "https://sos.example.org/sos",
            generated,
            universe_size: 1,
            records: &records,
            failures: &[],
        };

        write_records_json(&path, &export).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["records"][0]["short_name"], "Station 1");
        assert_eq!(value["records"][0]["service"]["abstract"], "about");
        assert_eq!(value["generated"], "2024-06-01T00:00:00Z");
    }
}
