//! Timezone handling for day-boundary grouping.
//!
//! Measurements are stored as UTC instants; every "which day was this" question
//! is answered in the user's configured zone.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, WeightRsError};

/// Zone used when nothing is configured
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Parse an IANA timezone identifier. An empty string selects UTC.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Ok(chrono_tz::UTC);
    }

    trimmed
        .parse::<Tz>()
        .map_err(|_| WeightRsError::Timezone(trimmed.to_string()))
}

/// Wall-clock time of a UTC instant in the given zone
pub fn to_local(timestamp: &DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
    timestamp.with_timezone(tz).naive_local()
}

/// Resolve a local wall-clock time to a UTC instant.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times that
/// fall in a DST gap are moved forward by one hour.
pub fn local_to_utc(local: NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}
