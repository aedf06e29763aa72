//! Timestamp parsing and formatting.
//!
//! Services emit ISO 8601 in several shapes (with or without fractional
//! seconds, `Z` or numeric offsets, sometimes no zone at all). Everything is
//! normalized to `DateTime<Utc>` so comparisons never mix naive and aware
//! values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Parse an ISO 8601 instant. Zone-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const OFFSET_FMTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];
    for fmt in OFFSET_FMTS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    const NAIVE_FMTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    for fmt in NAIVE_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `YYYY-MM-DDTHH:MM:SSZ`, the form used in request URLs and documents.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_common_shapes_to_the_same_instant() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for raw in [
            "2024-05-01T12:00:00Z",
            "2024-05-01T12:00:00.000Z",
            "2024-05-01T07:00:00-05:00",
            "2024-05-01T12:00:00",
            "2024-05-01T14:00:00.000+0200",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "failed on {raw}");
        }
    }

    #[test]
    fn date_only_is_midnight_utc() {
        let dt = parse_timestamp("2013-08-20").unwrap();
        assert_eq!(format_timestamp(&dt), "2013-08-20T00:00:00Z");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("now"), None);
        assert_eq!(parse_timestamp("yesterday-ish"), None);
    }
}
