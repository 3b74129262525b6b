//! Display range filtering and re-alignment of full-history series.
//!
//! Trend and corridor series are always computed over the complete history,
//! because the corridor recurrence depends on every prior day. When the user
//! narrows the display window, those series are projected onto the days that
//! remain visible.

use chrono_tz::Tz;
use tracing::debug;

use crate::models::{DateRange, Measurement};

/// Project a full-history series onto a filtered set of days.
///
/// For each filtered day the first full day that is greater than or equal to
/// it is located, and the series value at that index is emitted. When no such
/// day exists, or its index is beyond the end of the series, the entry is
/// `None`. This is a nearest-forward lookup, not an interpolation.
///
/// An empty series or an empty filter yields an empty result.
pub fn realign_to_filtered_days<T, K>(
    full_series: &[T],
    full_days: &[K],
    filtered_days: &[K],
) -> Vec<Option<T>>
where
    T: Clone,
    K: PartialOrd,
{
    if full_series.is_empty() || filtered_days.is_empty() {
        return Vec::new();
    }

    filtered_days
        .iter()
        .map(|day| {
            full_days
                .iter()
                .position(|full_day| full_day >= day)
                .and_then(|index| full_series.get(index).cloned())
        })
        .collect()
}

/// [`realign_to_filtered_days`] for series that already carry gaps
pub fn realign_optional<T, K>(
    full_series: &[Option<T>],
    full_days: &[K],
    filtered_days: &[K],
) -> Vec<Option<T>>
where
    T: Clone,
    K: PartialOrd,
{
    realign_to_filtered_days(full_series, full_days, filtered_days)
        .into_iter()
        .map(Option::flatten)
        .collect()
}

/// Keep the measurements whose local time falls inside the range
pub fn filter_measurements(measurements: &[Measurement], range: &DateRange, tz: &Tz) -> Vec<Measurement> {
    if !range.is_active() {
        return measurements.to_vec();
    }

    let filtered: Vec<Measurement> = measurements
        .iter()
        .filter(|m| range.contains(m.local_time(tz)))
        .cloned()
        .collect();

    debug!(
        total = measurements.len(),
        kept = filtered.len(),
        start = ?range.start,
        end = ?range.end,
        "Applied display date range"
    );

    filtered
}
