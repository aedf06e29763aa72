//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - runs the harvest pipeline
//! - renders and writes one ISO document per station
//! - writes optional exports and the verbose debug bundle
//! - prints the run summary

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use crate::cli::{Cli, SERVICE_URL_ENV, config_from_args};
use crate::domain::HarvestConfig;
use crate::error::AppError;
use crate::io::{RunExport, write_log_csv, write_records, write_records_json};
use crate::render::IsoRenderer;
use crate::report::{WriteOutcome, format_run_summary};

pub mod pipeline;

/// Entry point for the `sml2iso` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = config_from_args(&cli, std::env::var(SERVICE_URL_ENV).ok())?;
    crate::logging::init(config.verbose);

    info!(service = %config.service_url, "starting harvest");
    let mut run = pipeline::run(&config)?;

    let output_dir = output_dir(&config, &run.endpoint.server_name());
    let outcome = if config.dry_run {
        WriteOutcome::DryRun
    } else {
        let renderer = IsoRenderer::new(run.started);
        let summary = write_records(
            &output_dir,
            &run.endpoint.server_name(),
            &run.records,
            &renderer,
            &mut run.diagnostics,
        )?;
        WriteOutcome::Written {
            files: summary.written.len(),
            skipped: summary.skipped,
        }
    };

    if let Some(path) = &config.log_csv {
        let rows = write_log_csv(path, &run.failures, run.diagnostics.entries())?;
        info!(path = %path.display(), rows, "failure log written");
    }
    if let Some(path) = &config.export_json {
        let export = RunExport {
            service_url: run.endpoint.url().as_str(),
            generated: run.started,
            universe_size: run.universe_size,
            records: &run.records,
            failures: &run.failures,
        };
        write_records_json(path, &export)?;
        info!(path = %path.display(), "record export written");
    }
    if config.verbose {
        // The bundle is a convenience; failing to write it does not fail the run.
        match crate::debug::write_debug_bundle(&PathBuf::from("debug"), &run, &config) {
            Ok(path) => info!(path = %path.display(), "debug bundle written"),
            Err(e) => warn!("{e}"),
        }
    }

    println!("{}", format_run_summary(&run, outcome, &output_dir));

    if run.all_failed() {
        error!(stations = run.universe_size, "no station could be harvested");
    }
    Ok(())
}

/// `--output-dir`, else `./<server-name>`.
pub fn output_dir(config: &HarvestConfig, server_name: &str) -> PathBuf {
    config
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(".").join(server_name))
}
