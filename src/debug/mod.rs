//! Debug bundle writer for inspecting a verbose run.
//!
//! One markdown file per run under `debug/`: run parameters, the station
//! universe outcome, every diagnostic, and the raw descriptor text that was
//! parsed for each station.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::RunOutput;
use crate::domain::HarvestConfig;
use crate::error::AppError;

fn write_err(e: std::io::Error) -> AppError {
    AppError::runtime(format!("Failed to write debug bundle: {e}"))
}

pub fn write_debug_bundle(
    dir: &Path,
    output: &RunOutput,
    config: &HarvestConfig,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::runtime(format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let server = output.endpoint.server_name().replace(':', "_");
    let path = dir.join(format!("sml2iso_debug_{server}_{ts}.md"));

    let mut file = File::create(&path)
        .map_err(|e| AppError::runtime(format!("Failed to create debug file: {e}")))?;

    writeln!(file, "# sml2iso debug bundle").map_err(write_err)?;
    writeln!(file, "- generated: {}", Local::now().to_rfc3339()).map_err(write_err)?;
    writeln!(file, "- service: {}", output.endpoint.url()).map_err(write_err)?;
    writeln!(
        file,
        "- operations: {}",
        output
            .endpoint
            .operations()
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    )
    .map_err(write_err)?;
    writeln!(
        file,
        "- stations: {} (explicit list: {})",
        output.universe_size,
        config.stations.is_some()
    )
    .map_err(write_err)?;
    writeln!(
        file,
        "- active_station_days: {}",
        config
            .active_station_days
            .map(|d| d.to_string())
            .unwrap_or_else(|| "off".to_string())
    )
    .map_err(write_err)?;
    writeln!(file, "- getobs_req_hours: {}", config.getobs_req_hours).map_err(write_err)?;
    writeln!(file, "- response_formats: {}", config.response_formats.join(" | "))
        .map_err(write_err)?;
    writeln!(file, "- workers: {}, timeout: {}s", config.workers, config.timeout_secs)
        .map_err(write_err)?;

    writeln!(file, "\n## Records").map_err(write_err)?;
    writeln!(file, "| station | short_name | variables | download_formats | ending |")
        .map_err(write_err)?;
    writeln!(file, "| - | - | - | - | - |").map_err(write_err)?;
    for record in &output.records {
        writeln!(
            file,
            "| {} | {} | {} | {} | {} |",
            record.identifier,
            record.short_name.as_deref().unwrap_or(""),
            record.variable_names.join(", "),
            record.download_formats.len(),
            record
                .ending
                .map(|e| crate::domain::time::format_timestamp(&e))
                .unwrap_or_default()
        )
        .map_err(write_err)?;
    }

    writeln!(file, "\n## Failures").map_err(write_err)?;
    for failure in &output.failures {
        writeln!(file, "- `{}`: {}", failure.station, failure.cause).map_err(write_err)?;
    }

    writeln!(file, "\n## Diagnostics").map_err(write_err)?;
    for d in output.diagnostics.entries() {
        writeln!(
            file,
            "- {} `{}` {}",
            d.level,
            d.station.as_deref().unwrap_or("-"),
            d.message
        )
        .map_err(write_err)?;
    }

    writeln!(file, "\n## Raw descriptors").map_err(write_err)?;
    for (station, raw) in &output.raw_descriptors {
        writeln!(file, "\n### {station}\n```xml\n{}\n```", raw.trim()).map_err(write_err)?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::domain::{FailureRecord, ServiceEndpoint};
    use crate::harvest::Diagnostics;

    #[test]
    fn bundle_contains_failures_and_raw_descriptors() {
        let tmp = tempfile::tempdir().unwrap();
        let output = RunOutput {
            endpoint: ServiceEndpoint::parse("http://sos.example.org:8080/sos").unwrap(),
            records: Vec::new(),
            failures: vec![FailureRecord {
                station: "urn:ioos:station:x:2".to_string(),
                cause: "no usable descriptor".to_string(),
            }],
            diagnostics: Diagnostics::new(),
            universe_size: 2,
            inactive: 0,
            raw_descriptors: vec![(
                "urn:ioos:station:x:1".to_string(),
                "<sml:System/>".to_string(),
            )],
            started: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        };
        let config = HarvestConfig::for_service("http://sos.example.org:8080/sos");

        let path = write_debug_bundle(tmp.path(), &output, &config).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sml2iso_debug_sos.example.org_8080_"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("- `urn:ioos:station:x:2`: no usable descriptor"));
        assert!(text.contains("### urn:ioos:station:x:1\n```xml\n<sml:System/>\n```"));
        assert!(text.contains("- active_station_days: off"));
    }
}
