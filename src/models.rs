use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timezone;

/// A single recorded measurement (one weigh-in, one tape reading)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Unique entry identifier
    pub id: Uuid,

    /// Measured value, always finite once past the import layer
    pub value: f64,

    /// Moment the measurement was taken
    pub timestamp: DateTime<Utc>,

    /// Free-form note attached by the user or the importer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Measurement {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Measurement {
            id: Uuid::new_v4(),
            value,
            timestamp,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Calendar day of this measurement in the given zone
    pub fn local_day(&self, tz: &Tz) -> NaiveDate {
        self.local_time(tz).date()
    }

    /// Wall-clock time of this measurement in the given zone
    pub fn local_time(&self, tz: &Tz) -> NaiveDateTime {
        timezone::to_local(&self.timestamp, tz)
    }
}

/// Mean of all measurements recorded on one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Local calendar day
    pub day: NaiveDate,

    /// Unrounded arithmetic mean of the day's values
    pub mean: f64,

    /// Mean rounded to two decimals, the value that is charted
    pub average: f64,

    /// Number of measurements that fell on this day
    pub sample_count: u32,
}

impl DailyAggregate {
    pub fn new(day: NaiveDate, mean: f64, sample_count: u32) -> Self {
        DailyAggregate {
            day,
            mean,
            average: round_display(mean),
            sample_count,
        }
    }

    /// Series value used by trend and corridor computations
    pub fn value(&self) -> f64 {
        self.average
    }
}

/// Round to two decimal places for display
pub fn round_display(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One (time, value) pair fed to the trend regression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Instant of the point; regression x is real elapsed time between these
    pub at: DateTime<Utc>,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(at: DateTime<Utc>, value: f64) -> Self {
        SeriesPoint { at, value }
    }

    /// Point anchored at midnight UTC of the aggregate's calendar day, so
    /// consecutive days are exactly one day apart
    pub fn from_aggregate(aggregate: &DailyAggregate) -> Self {
        SeriesPoint {
            at: aggregate.day.and_time(NaiveTime::MIN).and_utc(),
            value: aggregate.value(),
        }
    }

    /// Point at the measurement's own instant
    pub fn from_measurement(measurement: &Measurement) -> Self {
        SeriesPoint {
            at: measurement.timestamp,
            value: measurement.value,
        }
    }
}

/// Inclusive display date range. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange { start, end }
    }

    /// Range with no bounds; filtering with it keeps everything
    pub fn unbounded() -> Self {
        DateRange::default()
    }

    /// The `days` days before `today`, through the end of `today`
    pub fn last_days(days: u32, today: NaiveDate) -> Self {
        let start = today
            .checked_sub_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MIN);
        DateRange {
            start: Some(start),
            end: Some(today),
        }
    }

    /// True when at least one bound is set
    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Whether a local wall-clock time falls inside the range.
    ///
    /// The start bound begins at 00:00:00.000, the end bound closes at
    /// 23:59:59.999 of its day.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        if let Some(start) = self.start {
            if at < start.and_time(NaiveTime::MIN) {
                return false;
            }
        }

        if let Some(end) = self.end {
            let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
            if at > end.and_time(end_of_day) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_round_display() {
        assert_eq!(round_display(80.456), 80.46);
        assert_eq!(round_display(80.454), 80.45);
        assert_eq!(round_display(80.0), 80.0);
    }

    #[test]
    fn test_daily_aggregate_keeps_unrounded_mean() {
        let aggregate = DailyAggregate::new(date(2024, 1, 1), 80.123456, 3);
        assert_eq!(aggregate.mean, 80.123456);
        assert_eq!(aggregate.average, 80.12);
        assert_eq!(aggregate.value(), 80.12);
    }

    #[test]
    fn test_local_day_uses_zone() {
        // 23:30 UTC on Jan 1 is already Jan 2 in Berlin
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        let m = Measurement::new(80.0, ts);

        assert_eq!(m.local_day(&chrono_tz::UTC), date(2024, 1, 1));
        assert_eq!(m.local_day(&chrono_tz::Europe::Berlin), date(2024, 1, 2));
    }

    #[test]
    fn test_date_range_bounds_are_inclusive() {
        let range = DateRange::new(Some(date(2024, 1, 3)), Some(date(2024, 1, 7)));
        assert!(range.is_active());

        assert!(range.contains(date(2024, 1, 3).and_hms_opt(0, 0, 0).unwrap()));
        assert!(range.contains(date(2024, 1, 7).and_hms_milli_opt(23, 59, 59, 999).unwrap()));
        assert!(!range.contains(date(2024, 1, 2).and_hms_opt(23, 59, 59).unwrap()));
        assert!(!range.contains(date(2024, 1, 8).and_hms_opt(0, 0, 0).unwrap()));
    }

    #[test]
    fn test_unbounded_range() {
        let range = DateRange::unbounded();
        assert!(!range.is_active());
        assert!(range.contains(NaiveDateTime::MIN));
    }

    #[test]
    fn test_last_days_preset() {
        let range = DateRange::last_days(30, date(2024, 3, 31));
        assert_eq!(range.start, Some(date(2024, 3, 1)));
        assert_eq!(range.end, Some(date(2024, 3, 31)));
    }

    #[test]
    fn test_measurement_serialization_skips_missing_note() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let json = serde_json::to_string(&Measurement::new(80.5, ts)).unwrap();
        assert!(!json.contains("note"));

        let json = serde_json::to_string(&Measurement::new(80.5, ts).with_note("after run")).unwrap();
        assert!(json.contains("\"note\":\"after run\""));
    }
}
