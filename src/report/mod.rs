//! Terminal run summary.
//!
//! Formatting lives here so the pipeline stays free of presentation code and
//! output changes stay localized.

use std::path::Path;

use crate::app::pipeline::RunOutput;
use crate::domain::DiagnosticLevel;

/// How the run's documents ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { files: usize, skipped: usize },
    DryRun,
}

/// Format the end-of-run summary printed to stdout.
pub fn format_run_summary(output: &RunOutput, outcome: WriteOutcome, output_dir: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== sml2iso - SensorML to ISO 19115-2 ===\n");
    out.push_str(&format!("Service: {}\n", output.endpoint.url()));
    out.push_str(&format!(
        "Started: {}\n",
        crate::domain::time::format_timestamp(&output.started)
    ));
    out.push_str(&format!(
        "Stations: {} | records: {} | failed: {} | inactive: {}\n",
        output.universe_size,
        output.records.len(),
        output.failures.len(),
        output.inactive,
    ));

    match outcome {
        WriteOutcome::Written { files, skipped } => {
            out.push_str(&format!(
                "Output: {} ({files} written, {skipped} skipped)\n",
                output_dir.display()
            ));
        }
        WriteOutcome::DryRun => out.push_str("Output: dry run, nothing written\n"),
    }

    let entries = output.diagnostics.entries();
    let errors = entries
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Error)
        .count();
    out.push_str(&format!(
        "Diagnostics: {} warnings, {errors} errors\n",
        entries.len() - errors
    ));

    if !output.failures.is_empty() {
        out.push_str("\nFailed stations:\n");
        for failure in &output.failures {
            out.push_str(&format!("  {:<40} {}\n", failure.station, failure.cause));
        }
    }

    out
}
