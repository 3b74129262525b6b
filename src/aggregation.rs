//! Daily aggregation of raw measurements.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{DailyAggregate, Measurement};

/// Group measurements by local calendar day and average each group.
///
/// Output is sorted ascending by day. Days without measurements are absent.
/// Within a day, values are summed in timestamp order so the result does not
/// depend on the order of the input slice.
pub fn aggregate_by_day(measurements: &[Measurement], tz: &Tz) -> Vec<DailyAggregate> {
    let mut days: BTreeMap<NaiveDate, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();

    for measurement in measurements {
        days.entry(measurement.local_day(tz))
            .or_default()
            .push((measurement.timestamp, measurement.value));
    }

    let aggregates: Vec<DailyAggregate> = days
        .into_iter()
        .map(|(day, mut samples)| {
            samples.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
            let sum: f64 = samples.iter().map(|(_, value)| value).sum();
            DailyAggregate::new(day, sum / samples.len() as f64, samples.len() as u32)
        })
        .collect();

    debug!(
        measurements = measurements.len(),
        days = aggregates.len(),
        timezone = %tz,
        "Aggregated measurements by day"
    );

    aggregates
}

/// Calendar days of an aggregate sequence, in order
pub fn aggregate_days(aggregates: &[DailyAggregate]) -> Vec<NaiveDate> {
    aggregates.iter().map(|a| a.day).collect()
}
