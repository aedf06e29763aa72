//! Command-line parsing for the SensorML -> ISO 19115-2 harvester.
//!
//! Parsing and validation live here; `app` maps the result into a
//! `HarvestConfig` and runs the pipeline.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::{
    DEFAULT_GETOBS_REQ_HOURS, DEFAULT_RESPONSE_FORMATS, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS,
    HarvestConfig, ServiceEndpoint,
};
use crate::error::AppError;

/// Environment variable consulted when `--service` is not given.
pub const SERVICE_URL_ENV: &str = "SOS_SERVICE_URL";

/// Top-level CLI.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "sml2iso",
    version,
    about = "Harvest SensorML station descriptions from an SOS 1.0.0 service into ISO 19115-2 XML"
)]
pub struct Cli {
    /// SOS service URL (falls back to SOS_SERVICE_URL, also read from .env).
    #[arg(short = 's', long, value_name = "URL")]
    pub service: Option<String>,

    /// Only process these station ids (comma separated), instead of every
    /// station offering in the capabilities document.
    #[arg(long, value_delimiter = ',', value_name = "ID,...")]
    pub stations: Vec<String>,

    /// Only keep stations with an observation in the last N days.
    #[arg(short = 'd', long, value_name = "DAYS")]
    pub active_station_days: Option<u32>,

    /// Width, in hours, of the time window in example GetObservation links.
    #[arg(long, default_value_t = DEFAULT_GETOBS_REQ_HOURS)]
    pub getobs_req_hours: u32,

    /// Response formats to offer as downloads (comma separated or repeated).
    #[arg(long, value_delimiter = ',', value_name = "FORMAT")]
    pub response_formats: Vec<String>,

    /// Output directory (default: ./<server-name>).
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Stations fetched in parallel.
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_name = "SECS")]
    pub timeout: u64,

    /// Write failed stations and warnings to this CSV file.
    #[arg(long, value_name = "CSV")]
    pub log_csv: Option<PathBuf>,

    /// Write the assembled records to this JSON file.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Debug logging plus a markdown debug bundle under ./debug.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Harvest and report, but write no documents.
    #[arg(long)]
    pub dry_run: bool,
}

/// Validate parsed arguments and build the run configuration.
///
/// `env_service` is the value of `SOS_SERVICE_URL`, if set.
pub fn config_from_args(cli: &Cli, env_service: Option<String>) -> Result<HarvestConfig, AppError> {
    let service_url = cli
        .service
        .clone()
        .or(env_service)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::usage(format!(
                "No SOS service URL: pass -s/--service or set {SERVICE_URL_ENV}."
            ))
        })?;
    // Fail on a bad URL before any network traffic.
    ServiceEndpoint::parse(&service_url)?;

    if cli.workers == 0 {
        return Err(AppError::usage("--workers must be at least 1."));
    }
    if cli.timeout == 0 {
        return Err(AppError::usage("--timeout must be at least 1 second."));
    }

    let stations = if cli.stations.is_empty() {
        None
    } else {
        let list = dedup_trimmed(&cli.stations);
        if list.is_empty() {
            return Err(AppError::usage("--stations was given but lists no station ids."));
        }
        Some(list)
    };

    let response_formats = if cli.response_formats.is_empty() {
        DEFAULT_RESPONSE_FORMATS.iter().map(|f| f.to_string()).collect()
    } else {
        dedup_trimmed(&cli.response_formats)
    };

    Ok(HarvestConfig {
        service_url,
        stations,
        active_station_days: cli.active_station_days,
        getobs_req_hours: cli.getobs_req_hours,
        response_formats,
        output_dir: cli.output_dir.clone(),
        workers: cli.workers,
        timeout_secs: cli.timeout,
        log_csv: cli.log_csv.clone(),
        export_json: cli.export_json.clone(),
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    })
}

/// Trim, drop empties and duplicates, keep first-seen order.
fn dedup_trimmed(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_USAGE;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sml2iso").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_apply() {
        let cli = parse(&["-s", "https://sos.example.org/sos"]);
        let config = config_from_args(&cli, None).unwrap();
        assert_eq!(config.service_url, "https://sos.example.org/sos");
        assert_eq!(config.stations, None);
        assert_eq!(config.active_station_days, None);
        assert_eq!(config.getobs_req_hours, DEFAULT_GETOBS_REQ_HOURS);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.response_formats.len(), DEFAULT_RESPONSE_FORMATS.len());
        assert!(!config.dry_run);
    }

    #[test]
    fn station_list_is_split_trimmed_and_deduplicated() {
        let cli = parse(&[
            "-s",
            "https://sos.example.org/sos",
            "--stations",
            "urn:ioos:station:x:1, urn:ioos:station:x:2,urn:ioos:station:x:1",
            "-d",
            "30",
        ]);
        let config = config_from_args(&cli, None).unwrap();
        assert_eq!(
            config.stations,
            Some(vec![
                "urn:ioos:station:x:1".to_string(),
                "urn:ioos:station:x:2".to_string()
            ])
        );
        assert_eq!(config.active_station_days, Some(30));
    }

    #[test]
    fn service_falls_back_to_environment() {
        let cli = parse(&["--dry-run"]);
        let config = config_from_args(&cli, Some("http://sos.example.org/kvp".to_string())).unwrap();
        assert_eq!(config.service_url, "http://sos.example.org/kvp");
        assert!(config.dry_run);
    }

    #[test]
    fn usage_errors() {
        let err = config_from_args(&parse(&[]), None).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);

        let err = config_from_args(&parse(&["-s", "ftp://x.org"]), None).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);

        let cli = parse(&["-s", "https://x.org", "--workers", "0"]);
        assert_eq!(config_from_args(&cli, None).unwrap_err().exit_code(), EXIT_USAGE);

        let cli = parse(&["-s", "https://x.org", "--stations", " , "]);
        assert_eq!(config_from_args(&cli, None).unwrap_err().exit_code(), EXIT_USAGE);
    }

    #[test]
    fn explicit_formats_replace_defaults() {
        let cli = parse(&[
            "-s",
            "https://x.org",
            "--response-formats",
            "text/csv",
            "--response-formats",
            "application/json",
        ]);
        let config = config_from_args(&cli, None).unwrap();
        assert_eq!(config.response_formats, vec!["text/csv", "application/json"]);
    }
}
