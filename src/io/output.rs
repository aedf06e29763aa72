//! Writing rendered documents, one file per station.
//!
//! A document that fails to render or write is reported as a diagnostic and
//! skipped; only failing to create the output directory aborts.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::StationRecord;
use crate::error::AppError;
use crate::harvest::Diagnostics;
use crate::render::Renderer;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
}

/// `<server>-<station>.<ext>` with path-hostile characters in the station id
/// (`:` and slashes) replaced by `_`.
pub fn output_file_name(server: &str, station: &str, extension: &str) -> String {
    let station = station.replace([':', '/', '\\'], "_");
    format!("{server}-{station}.{extension}")
}

pub fn write_records(
    dir: &Path,
    server: &str,
    records: &[StationRecord],
    renderer: &dyn Renderer,
    diagnostics: &mut Diagnostics,
) -> Result<WriteSummary, AppError> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::runtime(format!(
            "Failed to create output directory '{}': {e}",
            dir.display()
        ))
    })?;

    let mut summary = WriteSummary::default();
    for record in records {
        let station = record.identifier.as_str();
        let text = match renderer.render(record) {
            Ok(text) => text,
            Err(e) => {
                diagnostics.warn(Some(station), format!("render failed: {e}"));
                summary.skipped += 1;
                continue;
            }
        };

        let path = dir.join(output_file_name(server, station, renderer.extension()));
        match fs::write(&path, text) {
            Ok(()) => {
                debug!(station, path = %path.display(), "document written");
                summary.written.push(path);
            }
            Err(e) => {
                diagnostics.warn(
                    Some(station),
                    format!("failed to write '{}': {e}", path.display()),
                );
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::domain::ServiceMetadata;
    use crate::render::RenderError;

    struct Echo;

    impl Renderer for Echo {
        fn render(&self, record: &StationRecord) -> Result<String, RenderError> {
            if record.identifier.contains("bad") {
                return Err(RenderError::EmptyIdentifier);
            }
            Ok(format!("<doc id=\"{}\"/>", record.identifier))
        }
    }

    fn record(id: &str) -> StationRecord {
        StationRecord {
            identifier: id.to_string(),
            position: None,
            short_name: None,
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
            begin_service_date: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            service: ServiceMetadata::default(),
            response_formats: Vec::new(),
            download_formats: Vec::new(),
            observation_links: Default::default(),
        }
    }

    #[test]
    fn file_name_replaces_colons() {
        assert_eq!(
            output_file_name("sdf.ndbc.noaa.gov", "urn:ioos:station:wmo:41001", "xml"),
            "sdf.ndbc.noaa.gov-urn_ioos_station_wmo_41001.xml"
        );
        assert_eq!(output_file_name("h", "a/b", "xml"), "h-a_b.xml");
    }

    #[test]
    fn writes_one_file_per_record() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("out");
        let mut diagnostics = Diagnostics::new();
        let records = vec![record("urn:ioos:station:x:1"), record("urn:ioos:station:x:2")];

        let summary = write_records(&dir, "sos.example.org", &records, &Echo, &mut diagnostics).unwrap();

        assert_eq!(summary.written.len(), 2);
        assert_eq!(summary.skipped, 0);
        let text = fs::read_to_string(dir.join("sos.example.org-urn_ioos_station_x_1.xml")).unwrap();
        assert_eq!(text, "<doc id=\"urn:ioos:station:x:1\"/>");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn failures_become_warnings_and_the_rest_are_written() {
        let tmp = tempfile::tempdir().unwrap();
        let records = vec![record("urn:ioos:station:x:bad"), record("urn:ioos:station:x:2")];
        // A directory where the second file should go makes that write fail.
        let mut diagnostics = Diagnostics::new();
        fs::create_dir(tmp.path().join("srv-urn_ioos_station_x_2.xml")).unwrap();

        let summary = write_records(tmp.path(), "srv", &records, &Echo, &mut diagnostics).unwrap();

        assert!(summary.written.is_empty());
        assert_eq!(summary.skipped, 2);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics.entries()[1].station.as_deref(),
            Some("urn:ioos:station:x:2")
        );
    }
}
