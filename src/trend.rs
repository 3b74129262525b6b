//! Least-squares trend line over (elapsed days, value) pairs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::SeriesPoint;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Weekly change below which a trend counts as flat
pub const STABLE_CHANGE_PER_WEEK: f64 = 0.05;

/// Direction of a fitted trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl TrendDirection {
    pub fn description(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "rising",
            TrendDirection::Stable => "flat",
            TrendDirection::Decreasing => "falling",
        }
    }
}

/// Fitted line `value = slope * days_since(origin) + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    /// Time of the first point; x = 0 here
    pub origin: DateTime<Utc>,

    /// Change in value per day
    pub slope: f64,

    /// Value of the line at the origin
    pub intercept: f64,
}

impl TrendLine {
    /// Line value at an arbitrary time
    pub fn value_at(&self, at: DateTime<Utc>) -> f64 {
        self.slope * elapsed_days(self.origin, at) + self.intercept
    }

    pub fn slope_per_week(&self) -> f64 {
        self.slope * 7.0
    }

    pub fn direction(&self) -> TrendDirection {
        let weekly = self.slope_per_week();
        if weekly > STABLE_CHANGE_PER_WEEK {
            TrendDirection::Increasing
        } else if weekly < -STABLE_CHANGE_PER_WEEK {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    /// When the line reaches `target`, if that happens strictly after `after`.
    ///
    /// A flat line never reaches a different value, and a line moving away
    /// from the target crossed it in the past; both yield `None`.
    pub fn projected_crossing(&self, target: f64, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.slope == 0.0 {
            return None;
        }

        let days = (target - self.intercept) / self.slope;
        if !days.is_finite() {
            return None;
        }

        let crossing = self
            .origin
            .checked_add_signed(Duration::milliseconds((days * MILLIS_PER_DAY) as i64))?;
        (crossing > after).then_some(crossing)
    }
}

/// Fractional days of real elapsed time between two instants
pub fn elapsed_days(origin: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
    (at - origin).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Fit an ordinary least-squares line. Needs at least two points.
///
/// x is measured in days since the first point. When every point shares the
/// same x the denominator is zero and the line is horizontal at the mean.
pub fn fit_trend(points: &[SeriesPoint]) -> Option<TrendLine> {
    if points.len() < 2 {
        return None;
    }

    let origin = points[0].at;
    let xs: Vec<f64> = points.iter().map(|p| elapsed_days(origin, p.at)).collect();
    let n = points.len() as f64;

    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = points.iter().map(|p| p.value).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, point) in xs.iter().zip(points) {
        numerator += (x - x_mean) * (point.value - y_mean);
        denominator += (x - x_mean) * (x - x_mean);
    }

    let slope = if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    };

    Some(TrendLine {
        origin,
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

/// Trend value at every input point; empty when fewer than two points
pub fn compute_trend(points: &[SeriesPoint]) -> Vec<f64> {
    let Some(line) = fit_trend(points) else {
        debug!(points = points.len(), "Not enough points for a trend line");
        return Vec::new();
    };

    debug!(
        points = points.len(),
        slope = line.slope,
        intercept = line.intercept,
        "Fitted trend line"
    );

    points
        .iter()
        .map(|p| line.slope * elapsed_days(line.origin, p.at) + line.intercept)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn day(offset: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset as i64)
    }

    #[test]
    fn test_too_few_points() {
        assert!(compute_trend(&[]).is_empty());
        assert!(compute_trend(&[SeriesPoint::new(day(0), 80.0)]).is_empty());
        assert!(fit_trend(&[SeriesPoint::new(day(0), 80.0)]).is_none());
    }

    #[test]
    fn test_two_point_line() {
        let points = vec![SeriesPoint::new(day(0), 10.0), SeriesPoint::new(day(1), 20.0)];

        let line = fit_trend(&points).unwrap();
        assert_eq!(line.slope, 10.0);
        assert_eq!(line.intercept, 10.0);
        assert_eq!(compute_trend(&points), vec![10.0, 20.0]);
    }

    #[test]
    fn test_same_instant_gives_flat_line_at_mean() {
        let points = vec![
            SeriesPoint::new(day(0), 80.0),
            SeriesPoint::new(day(0), 82.0),
            SeriesPoint::new(day(0), 84.0),
        ];

        let line = fit_trend(&points).unwrap();
        assert_eq!(line.slope, 0.0);
        assert_eq!(compute_trend(&points), vec![82.0, 82.0, 82.0]);
    }

    #[test]
    fn test_fractional_days() {
        let noon = day(0) + Duration::hours(12);
        assert_eq!(elapsed_days(day(0), noon), 0.5);

        let points = vec![
            SeriesPoint::new(day(0), 80.0),
            SeriesPoint::new(noon, 79.5),
            SeriesPoint::new(day(1), 79.0),
        ];
        let trend = compute_trend(&points);
        assert!((trend[1] - 79.5).abs() < 1e-9);
    }

    #[test]
    fn test_direction_and_projection() {
        let points: Vec<SeriesPoint> = (0..10)
            .map(|i| SeriesPoint::new(day(i), 90.0 - 0.1 * i as f64))
            .collect();
        let line = fit_trend(&points).unwrap();

        assert_eq!(line.direction(), TrendDirection::Decreasing);
        assert!((line.slope_per_week() + 0.7).abs() < 1e-9);

        // 90 - 0.1 * d = 85 at d = 50
        let crossing = line.projected_crossing(85.0, day(9)).unwrap();
        assert!((elapsed_days(day(0), crossing) - 50.0).abs() < 1e-3);

        // Moving away from a higher target never reaches it
        assert!(line.projected_crossing(95.0, day(9)).is_none());
    }

    #[test]
    fn test_x_axis_is_real_elapsed_time_across_dst() {
        // New York fall-back: 01:30 EDT is 05:30 UTC, the later 01:10 EST is 06:10 UTC
        let first = Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 11, 3, 6, 10, 0).unwrap();
        assert!(elapsed_days(first, second) > 0.0);

        let line = fit_trend(&[SeriesPoint::new(first, 80.0), SeriesPoint::new(second, 79.0)]).unwrap();
        assert!(line.slope < 0.0);
    }

    proptest! {
        #[test]
        fn test_trend_length_and_idempotence(
            values in prop::collection::vec(40.0f64..200.0, 2..100)
        ) {
            let points: Vec<SeriesPoint> = values
                .iter()
                .enumerate()
                .map(|(i, &v)| SeriesPoint::new(day(i as u32), v))
                .collect();

            let first = compute_trend(&points);
            prop_assert_eq!(first.len(), points.len());
            prop_assert!(first.iter().all(|v| v.is_finite()));

            let second = compute_trend(&points);
            prop_assert_eq!(first, second);
        }
    }
}
