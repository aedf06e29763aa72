//! Recency filter on assembled records.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::domain::StationRecord;

/// Keep records whose last observation is within `lookback_days` of `now`.
///
/// - `None` keeps everything (pass `None`, not zero, to disable filtering)
/// - days are fixed 24h spans, not calendar-aware
/// - a record with no `ending` is excluded
pub fn filter_active(
    records: Vec<StationRecord>,
    lookback_days: Option<u32>,
    now: DateTime<Utc>,
) -> Vec<StationRecord> {
    let Some(days) = lookback_days else {
        return records;
    };
    // A lookback reaching past the representable range keeps every dated record.
    let cutoff = now
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let before = records.len();
    let kept: Vec<StationRecord> = records
        .into_iter()
        .filter(|r| r.ending.is_some_and(|end| end > cutoff))
        .collect();

    info!(
        days,
        kept = kept.len(),
        dropped = before - kept.len(),
        "active station filter applied"
    );
    kept
}
