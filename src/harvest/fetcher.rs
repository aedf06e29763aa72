//! Per-station descriptor retrieval and record assembly.
//!
//! Each station is independent: negotiate a descriptor, parse it, enrich it
//! with capabilities metadata. A station that fails is reported and skipped;
//! it never stops the run. Stations are processed on a bounded rayon pool and
//! results come back in station-universe order.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::data::SosService;
use crate::domain::formats::same_format;
use crate::domain::{FailureRecord, StationRecord};
use crate::error::AppError;
use crate::harvest::capabilities::CapabilitiesSnapshot;
use crate::harvest::descriptor::{self, ParsedDescriptor};
use crate::harvest::diagnostics::Diagnostics;
use crate::harvest::dialect::DescriptorDialect;
use crate::harvest::negotiate::fetch_descriptor;

/// Knobs for one `fetch_all` call.
#[derive(Debug, Clone)]
pub struct FetchOptions<'a> {
    pub requested_formats: &'a [String],
    pub workers: usize,
    /// Keep raw descriptor text for the debug bundle.
    pub keep_raw: bool,
    /// Fetch time; default for missing descriptor begin dates.
    pub now: DateTime<Utc>,
}

/// Result of processing a single station.
#[derive(Debug, Clone)]
pub struct StationOutcome {
    pub station: String,
    pub result: Result<StationRecord, FailureRecord>,
    pub diagnostics: Diagnostics,
    pub raw_descriptor: Option<String>,
}

/// Merged results for the whole station universe.
#[derive(Debug, Clone, Default)]
pub struct FetchOutput {
    pub records: Vec<StationRecord>,
    pub failures: Vec<FailureRecord>,
    pub diagnostics: Diagnostics,
    /// `(station, raw descriptor)`, only when `keep_raw` was set.
    pub raw_descriptors: Vec<(String, String)>,
}

pub fn fetch_all(
    service: &dyn SosService,
    snapshot: &CapabilitiesSnapshot,
    universe: &[String],
    options: &FetchOptions<'_>,
) -> Result<FetchOutput, AppError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .build()
        .map_err(|e| AppError::runtime(format!("Failed to start worker pool: {e}")))?;

    // `collect` on an indexed parallel iterator keeps input order.
    let outcomes: Vec<StationOutcome> = pool.install(|| {
        universe
            .par_iter()
            .map(|station| fetch_station(service, snapshot, station, options))
            .collect()
    });

    let mut out = FetchOutput::default();
    for outcome in outcomes {
        out.diagnostics.extend(outcome.diagnostics);
        if let Some(raw) = outcome.raw_descriptor {
            out.raw_descriptors.push((outcome.station.clone(), raw));
        }
        match outcome.result {
            Ok(record) => out.records.push(record),
            Err(failure) => out.failures.push(failure),
        }
    }

    info!(
        stations = universe.len(),
        records = out.records.len(),
        failures = out.failures.len(),
        "descriptor harvest complete"
    );
    Ok(out)
}

pub fn fetch_station(
    service: &dyn SosService,
    snapshot: &CapabilitiesSnapshot,
    station: &str,
    options: &FetchOptions<'_>,
) -> StationOutcome {
    let mut diagnostics = Diagnostics::new();
    let fail = |cause: String| FailureRecord {
        station: station.to_string(),
        cause,
    };

    if station.trim().is_empty() {
        return StationOutcome {
            station: station.to_string(),
            result: Err(fail("empty station identifier".to_string())),
            diagnostics,
            raw_descriptor: None,
        };
    }

    let document = match fetch_descriptor(service, station, &DescriptorDialect::ALL) {
        Ok(doc) => doc,
        Err(not_found) => {
            warn!(station, "{not_found}");
            return StationOutcome {
                station: station.to_string(),
                result: Err(fail(not_found.to_string())),
                diagnostics,
                raw_descriptor: None,
            };
        }
    };
    let raw_descriptor = options.keep_raw.then(|| document.raw.clone());

    let parsed = match descriptor::parse(&document) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(station, error = %err, "descriptor unusable");
            return StationOutcome {
                station: station.to_string(),
                result: Err(fail(err.to_string())),
                diagnostics,
                raw_descriptor,
            };
        }
    };

    for warning in &parsed.warnings {
        diagnostics.warn(Some(station), warning.clone());
    }

    let record = assemble_record(station, parsed, snapshot, options, &mut diagnostics);
    debug!(
        station,
        dialect = document.dialect.display_name(),
        variables = record.variables.len(),
        "station record assembled"
    );

    StationOutcome {
        station: station.to_string(),
        result: Ok(record),
        diagnostics,
        raw_descriptor,
    }
}

/// Combine descriptor fields with capabilities-level metadata.
pub fn assemble_record(
    station: &str,
    parsed: ParsedDescriptor,
    snapshot: &CapabilitiesSnapshot,
    options: &FetchOptions<'_>,
    diagnostics: &mut Diagnostics,
) -> StationRecord {
    let offering = snapshot.offering(station);
    if offering.is_none() {
        diagnostics.warn(
            Some(station),
            "station is not advertised in capabilities; no formats or observation window",
        );
    }

    let response_formats = offering
        .map(|o| o.response_formats.clone())
        .unwrap_or_default();
    let download_formats: Vec<String> = response_formats
        .iter()
        .filter(|f| options.requested_formats.iter().any(|r| same_format(f, r)))
        .cloned()
        .collect();
    if download_formats.is_empty() && !response_formats.is_empty() {
        diagnostics.warn(
            Some(station),
            "none of the requested response formats are advertised",
        );
    }

    StationRecord {
        identifier: station.to_string(),
        position: parsed.position,
        short_name: parsed.short_name,
        long_name: parsed.long_name,
        wmo_id: parsed.wmo_id,
        platform_type: parsed.platform_type,
        parent_network: parsed.parent_network,
        sponsor: parsed.sponsor,
        contacts: parsed.contacts,
        documents: parsed.documents,
        variables: parsed.variables,
        variable_names: parsed.variable_names,
        starting: offering.and_then(|o| o.begin),
        ending: offering.and_then(|o| o.end),
        // Approximation: an undated descriptor is treated as valid from now.
        begin_service_date: parsed.begin.unwrap_or(options.now),
        service: snapshot.service.clone(),
        response_formats,
        download_formats,
        observation_links: Default::default(),
    }
}
