//! The harvest workflow, independent of how results are presented or written:
//! capabilities -> per-station fetch/parse/enrich -> active filter -> links
//!
//! `run` wires in the HTTP client; `run_with_service` takes any `SosService`
//! so the whole flow can be exercised against in-memory fakes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Url;
use tracing::info;

use crate::data::{HttpSosClient, SosService};
use crate::domain::{FailureRecord, HarvestConfig, ServiceEndpoint, StationRecord};
use crate::error::AppError;
use crate::harvest::{Diagnostics, FetchOptions, build_links, fetch_all, filter_active, resolve};

/// Everything a single run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Endpoint enriched with the advertised operations.
    pub endpoint: ServiceEndpoint,
    pub records: Vec<StationRecord>,
    pub failures: Vec<FailureRecord>,
    pub diagnostics: Diagnostics,
    pub universe_size: usize,
    /// Records dropped by the active-station filter.
    pub inactive: usize,
    /// `(station, raw descriptor)`; populated on verbose runs only.
    pub raw_descriptors: Vec<(String, String)>,
    pub started: DateTime<Utc>,
}

impl RunOutput {
    /// Every station in a non-empty universe failed.
    pub fn all_failed(&self) -> bool {
        self.universe_size > 0 && self.failures.len() == self.universe_size
    }
}

/// Execute the harvest against the configured HTTP service.
pub fn run(config: &HarvestConfig) -> Result<RunOutput, AppError> {
    let endpoint = ServiceEndpoint::parse(&config.service_url)?;
    let client = HttpSosClient::new(endpoint, Duration::from_secs(config.timeout_secs))?;
    run_with_service(&client, config, Utc::now())
}

/// Execute the harvest against any service implementation.
///
/// `now` anchors every time-relative decision of the run (default begin
/// dates, the active filter, link windows).
pub fn run_with_service(
    service: &dyn SosService,
    config: &HarvestConfig,
    now: DateTime<Utc>,
) -> Result<RunOutput, AppError> {
    // 1) Capabilities: the only fatal step.
    let resolved = resolve(service, config.stations.as_deref(), now)?;
    let mut diagnostics = Diagnostics::new();
    if resolved.universe.is_empty() {
        diagnostics.warn(None, "station universe is empty; nothing to harvest");
    }

    // 2) Per-station descriptors.
    let options = FetchOptions {
        requested_formats: &config.response_formats,
        workers: config.workers,
        keep_raw: config.verbose,
        now,
    };
    let fetched = fetch_all(service, &resolved.snapshot, &resolved.universe, &options)?;
    diagnostics.extend(fetched.diagnostics);

    // 3) Active filter.
    let assembled = fetched.records.len();
    let mut records = filter_active(fetched.records, config.active_station_days, now);
    let inactive = assembled - records.len();

    // 4) Example links.
    let base = getobs_base(&resolved.endpoint, &mut diagnostics);
    for record in &mut records {
        build_links(record, config.getobs_req_hours, &base, now);
    }

    let mut output = RunOutput {
        endpoint: resolved.endpoint,
        records,
        failures: fetched.failures,
        diagnostics,
        universe_size: resolved.universe.len(),
        inactive,
        raw_descriptors: fetched.raw_descriptors,
        started: now,
    };

    // Not fatal: the run completed, it just produced nothing.
    if output.all_failed() {
        let message = format!("all {} stations failed", output.universe_size);
        output.diagnostics.error(None, message);
    }

    info!(
        records = output.records.len(),
        failures = output.failures.len(),
        inactive = output.inactive,
        "harvest finished"
    );
    Ok(output)
}

/// GetObservation base URL: the advertised GET href, else the service URL.
fn getobs_base(endpoint: &ServiceEndpoint, diagnostics: &mut Diagnostics) -> Url {
    let href = endpoint.operation_href("GetObservation");
    match Url::parse(href) {
        Ok(url) => url,
        Err(e) => {
            diagnostics.warn(
                None,
                format!("advertised GetObservation href '{href}' is not a URL ({e}); using the service URL"),
            );
            endpoint.url().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::data::ServiceError;
    use crate::domain::DiagnosticLevel;
    use crate::harvest::DescriptorDialect;
    use crate::harvest::capabilities::tests::CAPABILITIES;
    use crate::harvest::descriptor::tests::{IOOS_DESCRIPTOR, LEGACY_DESCRIPTOR};
    use crate::harvest::negotiate::tests::FakeService;

    const S1: &str = "urn:ioos:station:x:1";
    const S2: &str = "urn:ioos:station:x:2";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn config() -> HarvestConfig {
        let mut config = HarvestConfig::for_service("https://sos.example.org/sos");
        config.response_formats = vec!["text/csv".to_string()];
        config.workers = 2;
        config
    }

    #[test]
    fn one_station_succeeds_and_one_fails() {
        let service = FakeService::new(CAPABILITIES).with_descriptor(
            S1,
            DescriptorDialect::IoosProfile,
            IOOS_DESCRIPTOR,
        );
        let out = run_with_service(&service, &config(), now()).unwrap();

        assert_eq!(out.universe_size, 2);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].identifier, S1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].station, S2);
        assert!(!out.all_failed());
    }

    #[test]
    fn links_use_the_advertised_getobservation_href() {
        let service = FakeService::new(CAPABILITIES).with_descriptor(
            S1,
            DescriptorDialect::IoosProfile,
            IOOS_DESCRIPTOR,
        );
        let out = run_with_service(&service, &config(), now()).unwrap();
        let record = &out.records[0];

        // Two variables x one download format.
        assert_eq!(record.observation_links.len(), 2);
        let link = &record.observation_links["air_temperature-text/csv"];
        assert!(link.url.starts_with("https://sos.example.org/sos/kvp?service=SOS&amp;"));
        assert!(link.url.ends_with("eventTime=2024-05-01T10:00:00Z/2024-05-01T12:00:00Z"));
    }

    #[test]
    fn active_filter_drops_stale_stations() {
        let service = FakeService::new(CAPABILITIES)
            .with_descriptor(S1, DescriptorDialect::IoosProfile, IOOS_DESCRIPTOR)
            .with_descriptor(S2, DescriptorDialect::SensorMl101, LEGACY_DESCRIPTOR);
        let mut config = config();
        config.active_station_days = Some(7);

        let out = run_with_service(&service, &config, now()).unwrap();
        // x:1 ended a month ago; x:2 is open-ended ("now").
        let ids: Vec<&str> = out.records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec![S2]);
        assert_eq!(out.inactive, 1);
    }

    #[test]
    fn verbose_runs_keep_raw_descriptors() {
        let service = FakeService::new(CAPABILITIES).with_descriptor(
            S1,
            DescriptorDialect::IoosProfile,
            IOOS_DESCRIPTOR,
        );
        let mut config = config();
        config.verbose = true;
        config.stations = Some(vec![S1.to_string()]);

        let out = run_with_service(&service, &config, now()).unwrap();
        assert_eq!(out.raw_descriptors.len(), 1);
        assert_eq!(out.raw_descriptors[0].0, S1);
    }

    #[test]
    fn all_failed_is_reported_but_not_fatal() {
        let service = FakeService::new(CAPABILITIES);
        let out = run_with_service(&service, &config(), now()).unwrap();
        assert!(out.all_failed());
        assert!(out.records.is_empty());
        assert!(
            out.diagnostics
                .entries()
                .iter()
                .any(|d| d.level == DiagnosticLevel::Error)
        );
    }

    #[test]
    fn capabilities_failure_aborts_the_run() {
        let mut service = FakeService::new("");
        service.capabilities = Err(ServiceError::Status {
            url: "https://sos.example.org/sos".to_string(),
            status: 503,
        });
        let err = run_with_service(&service, &config(), now()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_RUNTIME);
        assert!(err.message().contains("HTTP 503"));
    }
}
