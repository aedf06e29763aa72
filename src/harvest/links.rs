//! Example GetObservation requests per (variable, format).
//!
//! The links are illustrative. When the offering's observation window is
//! unknown the time window is anchored at the current instant instead.

use chrono::{DateTime, Duration, Utc};
use reqwest::Url;

use crate::domain::formats::{format_name, format_type};
use crate::domain::time::format_timestamp;
use crate::domain::{ObservationLink, SOS_VERSION, StationRecord};

/// `[ending - hours, ending]` when the record's window is known, else
/// `[now - hours, now]`.
pub fn event_window(
    record: &StationRecord,
    lookback_hours: u32,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let span = Duration::hours(i64::from(lookback_hours));
    let end = match (record.starting, record.ending) {
        (Some(_), Some(end)) => end,
        _ => now,
    };
    let start = end
        .checked_sub_signed(span)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    (start, end)
}

/// Fill `record.observation_links` for every variable x download format.
pub fn build_links(
    record: &mut StationRecord,
    lookback_hours: u32,
    getobs_base: &Url,
    now: DateTime<Utc>,
) {
    let (start, end) = event_window(record, lookback_hours, now);
    let event_time = format!("{}/{}", format_timestamp(&start), format_timestamp(&end));

    let mut links = std::mem::take(&mut record.observation_links);
    for variable in &record.variable_names {
        for format in &record.download_formats {
            let url = observation_url(
                getobs_base,
                &record.identifier,
                variable,
                format,
                &event_time,
            );
            links.insert(
                format!("{variable}-{format}"),
                ObservationLink {
                    variable: variable.clone(),
                    url,
                    format_type: format_type(format),
                    format_name: format_name(format),
                },
            );
        }
    }
    record.observation_links = links;
}

/// Query-encode the request, then decode it again for readability. Every
/// `&` in the decoded query, separators and any inside keys or values, is
/// written as `&amp;` so the result can be embedded in markup.
fn observation_url(
    base: &Url,
    offering: &str,
    variable: &str,
    format: &str,
    event_time: &str,
) -> String {
    let mut url = base.clone();
    url.query_pairs_mut().extend_pairs([
        ("service", "SOS"),
        ("request", "GetObservation"),
        ("version", SOS_VERSION),
        ("offering", offering),
        ("observedProperty", variable),
        ("responseFormat", format),
        ("eventTime", event_time),
    ]);

    let query: Vec<String> = url
        .query_pairs()
        .map(|(key, value)| format!("{key}={value}").replace('&', "&amp;"))
        .collect();
    url.set_query(None);
    format!("{url}?{}", query.join("&amp;"))
}
