//! Chart data assembly.
//!
//! Runs the full analytics pipeline the way the chart view consumes it:
//! reference lines are computed over the entire history, the display range is
//! applied to raw measurements afterwards, and the reference lines are then
//! re-aligned onto whatever is left on screen.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregation::{aggregate_by_day, aggregate_days};
use crate::alignment::{filter_measurements, realign_optional, realign_to_filtered_days};
use crate::corridor::{compute_corridor, Corridor, CorridorPosition, GoalConfig};
use crate::models::{DateRange, Measurement, SeriesPoint};
use crate::timezone::to_local;
use crate::trend::{compute_trend, fit_trend, TrendDirection};

/// What the value series of a chart is made of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesMode {
    /// One point per day, the daily average
    #[default]
    Daily,
    /// One point per measurement
    Individual,
}

impl std::str::FromStr for SeriesMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "average" | "averages" => Ok(SeriesMode::Daily),
            "individual" | "raw" | "entries" => Ok(SeriesMode::Individual),
            _ => Err(format!("Invalid series mode: {}", s)),
        }
    }
}

/// Headline numbers for the displayed window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    /// Number of plotted points
    pub points: usize,

    /// Number of distinct days in the window
    pub days: usize,

    pub first_value: Option<f64>,
    pub latest_value: Option<f64>,

    /// Latest minus first displayed value
    pub change: Option<f64>,

    /// Full-history trend slope, per week
    pub trend_per_week: Option<f64>,
    pub trend_direction: Option<TrendDirection>,

    /// Latest value relative to the corridor on its day
    pub latest_position: Option<CorridorPosition>,

    /// Day the full-history trend reaches the goal, if it is heading there
    pub projected_goal_date: Option<NaiveDate>,
}

/// Everything needed to draw the chart.
///
/// `trend` and the corridor series are either empty (not enough history) or
/// exactly as long as `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub mode: SeriesMode,
    pub labels: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
    pub trend: Vec<Option<f64>>,
    pub corridor: Corridor,
    pub summary: ChartSummary,
}

/// One chart row, flattened for tables and exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub label: String,
    pub value: f64,
    pub trend: Option<f64>,
    pub floor: Option<f64>,
    pub ceiling: Option<f64>,
    pub ideal: Option<f64>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Display label for a point
    pub fn label(&self, index: usize) -> Option<String> {
        let at = self.labels.get(index)?;
        Some(match self.mode {
            SeriesMode::Daily => at.format("%Y-%m-%d").to_string(),
            SeriesMode::Individual => at.format("%Y-%m-%d %H:%M").to_string(),
        })
    }

    pub fn rows(&self) -> Vec<ChartRow> {
        let series_at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

        self.values
            .iter()
            .enumerate()
            .map(|(i, &value)| ChartRow {
                label: self.label(i).unwrap_or_default(),
                value,
                trend: series_at(&self.trend, i),
                floor: series_at(&self.corridor.floor, i),
                ceiling: series_at(&self.corridor.ceiling, i),
                ideal: series_at(&self.corridor.ideal, i),
            })
            .collect()
    }
}

/// Builds [`ChartData`] from raw measurements
#[derive(Debug, Clone)]
pub struct ChartBuilder {
    timezone: Tz,
    goal: GoalConfig,
    range: DateRange,
    mode: SeriesMode,
}

impl ChartBuilder {
    pub fn new(timezone: Tz) -> Self {
        ChartBuilder {
            timezone,
            goal: GoalConfig::default(),
            range: DateRange::unbounded(),
            mode: SeriesMode::Daily,
        }
    }

    pub fn with_goal(mut self, goal: GoalConfig) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_mode(mut self, mode: SeriesMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(&self, measurements: &[Measurement]) -> ChartData {
        let tz = &self.timezone;

        let mut all = measurements.to_vec();
        all.sort_by_key(|m| m.timestamp);

        // Reference lines always use the complete history
        let all_daily = aggregate_by_day(&all, tz);
        let all_days = aggregate_days(&all_daily);
        let trend_points: Vec<SeriesPoint> = match self.mode {
            SeriesMode::Daily => all_daily.iter().map(SeriesPoint::from_aggregate).collect(),
            SeriesMode::Individual => all
                .iter()
                .map(SeriesPoint::from_measurement)
                .collect(),
        };
        let trend_line = fit_trend(&trend_points);
        let all_trend = compute_trend(&trend_points);
        let full_corridor = compute_corridor(&all_daily, &self.goal);

        let shown = filter_measurements(&all, &self.range, tz);
        let shown_daily = aggregate_by_day(&shown, tz);

        let (labels, values, trend, corridor) = match self.mode {
            SeriesMode::Daily => {
                let labels: Vec<NaiveDateTime> = shown_daily
                    .iter()
                    .map(|a| a.day.and_time(NaiveTime::MIN))
                    .collect();
                let values: Vec<f64> = shown_daily.iter().map(|a| a.value()).collect();

                if self.range.is_active() {
                    let shown_days = aggregate_days(&shown_daily);
                    let corridor = Corridor {
                        floor: realign_optional(&full_corridor.floor, &all_days, &shown_days),
                        ceiling: realign_optional(&full_corridor.ceiling, &all_days, &shown_days),
                        ideal: realign_optional(&full_corridor.ideal, &all_days, &shown_days),
                    };
                    let trend = realign_to_filtered_days(&all_trend, &all_days, &shown_days);
                    (labels, values, trend, corridor)
                } else {
                    let trend = all_trend.iter().copied().map(Some).collect();
                    (labels, values, trend, full_corridor)
                }
            }
            SeriesMode::Individual => {
                let labels: Vec<NaiveDateTime> = shown.iter().map(|m| m.local_time(tz)).collect();
                let values: Vec<f64> = shown.iter().map(|m| m.value).collect();

                // Trend is per measurement, keyed by UTC instant; the corridor
                // is per day, so each measurement picks up its own day's value
                let trend = if self.range.is_active() {
                    let all_instants: Vec<DateTime<Utc>> =
                        trend_points.iter().map(|p| p.at).collect();
                    let shown_instants: Vec<DateTime<Utc>> =
                        shown.iter().map(|m| m.timestamp).collect();
                    realign_to_filtered_days(&all_trend, &all_instants, &shown_instants)
                } else {
                    all_trend.iter().copied().map(Some).collect()
                };

                let shown_days: Vec<NaiveDate> = labels.iter().map(|at| at.date()).collect();
                let corridor = Corridor {
                    floor: realign_optional(&full_corridor.floor, &all_days, &shown_days),
                    ceiling: realign_optional(&full_corridor.ceiling, &all_days, &shown_days),
                    ideal: realign_optional(&full_corridor.ideal, &all_days, &shown_days),
                };
                (labels, values, trend, corridor)
            }
        };

        let latest_position = values
            .last()
            .and_then(|&latest| corridor.position(values.len() - 1, latest));

        let projected_goal_date = match (trend_line, trend_points.last()) {
            (Some(line), Some(last)) if self.goal.target_value > 0.0 => line
                .projected_crossing(self.goal.target_value, last.at)
                .map(|at| match self.mode {
                    // Daily points sit at UTC midnight of their local day
                    SeriesMode::Daily => at.date_naive(),
                    SeriesMode::Individual => to_local(&at, tz).date(),
                }),
            _ => None,
        };

        let summary = ChartSummary {
            points: values.len(),
            days: shown_daily.len(),
            first_value: values.first().copied(),
            latest_value: values.last().copied(),
            change: values.first().zip(values.last()).map(|(first, last)| last - first),
            trend_per_week: trend_line.map(|line| line.slope_per_week()),
            trend_direction: trend_line.map(|line| line.direction()),
            latest_position,
            projected_goal_date,
        };

        debug!(
            mode = ?self.mode,
            range_active = self.range.is_active(),
            trend_points = trend_points.len(),
            history_days = all_days.len(),
            "Assembled chart series"
        );
        info!(
            points = summary.points,
            days = summary.days,
            "Chart data ready"
        );

        ChartData {
            mode: self.mode,
            labels,
            values,
            trend,
            corridor,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn morning(day: u32, value: f64) -> Measurement {
        Measurement::new(value, Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap())
    }

    fn evening(day: u32, value: f64) -> Measurement {
        Measurement::new(value, Utc.with_ymd_and_hms(2024, 1, day, 20, 0, 0).unwrap())
    }

    fn history(days: u32) -> Vec<Measurement> {
        (1..=days).map(|d| morning(d, 100.0 - 0.2 * d as f64)).collect()
    }

    #[test]
    fn test_empty_history() {
        let chart = ChartBuilder::new(chrono_tz::UTC).build(&[]);
        assert!(chart.is_empty());
        assert!(chart.trend.is_empty());
        assert!(chart.corridor.is_empty());
        assert_eq!(chart.summary, ChartSummary::default());
    }

    #[test]
    fn test_short_history_has_trend_but_no_corridor() {
        let chart = ChartBuilder::new(chrono_tz::UTC).build(&history(3));
        assert_eq!(chart.values.len(), 3);
        assert_eq!(chart.trend.len(), 3);
        assert!(chart.corridor.is_empty());

        let rows = chart.rows();
        assert_eq!(rows[0].label, "2024-01-01");
        assert!(rows[0].floor.is_none());
    }

    #[test]
    fn test_unfiltered_daily_chart() {
        let mut measurements = history(10);
        measurements.push(evening(1, 100.0));

        let chart = ChartBuilder::new(chrono_tz::UTC)
            .with_goal(GoalConfig::new(90.0))
            .build(&measurements);

        assert_eq!(chart.values.len(), 10);
        assert_eq!(chart.values[0], 99.9);
        assert_eq!(chart.corridor.len(), 10);
        assert!(chart.corridor.floor[5].is_none());
        assert!(chart.corridor.floor[6].is_some());
        assert_eq!(chart.summary.trend_direction, Some(TrendDirection::Decreasing));
    }

    #[test]
    fn test_filtered_chart_keeps_full_history_corridor() {
        let measurements = history(20);
        let goal = GoalConfig::new(90.0);

        let full = ChartBuilder::new(chrono_tz::UTC)
            .with_goal(goal)
            .build(&measurements);
        let filtered = ChartBuilder::new(chrono_tz::UTC)
            .with_goal(goal)
            .with_range(DateRange::new(Some(jan(12)), Some(jan(15))))
            .build(&measurements);

        assert_eq!(filtered.values.len(), 4);
        assert_eq!(filtered.corridor.floor.len(), 4);
        // Jan 12 is index 11 of the full history
        assert_eq!(filtered.corridor.floor[0], full.corridor.floor[11]);
        assert_eq!(filtered.corridor.ideal[3], full.corridor.ideal[14]);
        assert_eq!(filtered.trend[0], full.trend[11]);
        assert_eq!(filtered.summary.days, 4);
    }

    #[test]
    fn test_filter_at_start_exposes_warm_up_gap() {
        let measurements = history(10);
        let chart = ChartBuilder::new(chrono_tz::UTC)
            .with_goal(GoalConfig::new(90.0))
            .with_range(DateRange::new(None, Some(jan(8))))
            .build(&measurements);

        assert_eq!(chart.values.len(), 8);
        assert!(chart.corridor.floor[..6].iter().all(Option::is_none));
        assert!(chart.corridor.floor[6].is_some());
    }

    #[test]
    fn test_individual_mode() {
        let mut measurements = history(8);
        measurements.push(evening(8, 98.0));

        let chart = ChartBuilder::new(chrono_tz::UTC)
            .with_goal(GoalConfig::new(90.0))
            .with_mode(SeriesMode::Individual)
            .build(&measurements);

        assert_eq!(chart.values.len(), 9);
        assert_eq!(chart.trend.len(), 9);
        assert!(chart.trend.iter().all(Option::is_some));
        // Both Jan 8 points share the corridor value of Jan 8
        assert_eq!(chart.corridor.floor[7], chart.corridor.floor[8]);
        assert!(chart.corridor.floor[7].is_some());
        assert_eq!(chart.label(8).unwrap(), "2024-01-08 20:00");
    }

    #[test]
    fn test_individual_trend_follows_elapsed_time_across_dst() {
        let tz = chrono_tz::America::New_York;
        // 01:30 EDT is followed 40 minutes later by 01:10 EST
        let measurements = vec![
            Measurement::new(80.0, Utc.with_ymd_and_hms(2024, 11, 2, 12, 0, 0).unwrap()),
            Measurement::new(79.8, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap()),
            Measurement::new(79.6, Utc.with_ymd_and_hms(2024, 11, 3, 6, 10, 0).unwrap()),
            Measurement::new(79.4, Utc.with_ymd_and_hms(2024, 11, 4, 13, 0, 0).unwrap()),
        ];
        let points: Vec<SeriesPoint> =
            measurements.iter().map(SeriesPoint::from_measurement).collect();
        let expected: Vec<Option<f64>> = compute_trend(&points).into_iter().map(Some).collect();

        let chart = ChartBuilder::new(tz)
            .with_mode(SeriesMode::Individual)
            .build(&measurements);
        assert_eq!(chart.trend, expected);
        assert_eq!(chart.label(1).unwrap(), "2024-11-03 01:30");
        assert_eq!(chart.label(2).unwrap(), "2024-11-03 01:10");

        let ranged = ChartBuilder::new(tz)
            .with_mode(SeriesMode::Individual)
            .with_range(DateRange::new(
                Some(NaiveDate::from_ymd_opt(2024, 11, 3).unwrap()),
                None,
            ))
            .build(&measurements);
        assert_eq!(ranged.trend, expected[1..].to_vec());
    }

    #[test]
    fn test_summary_and_projection() {
        let measurements = history(14);
        let chart = ChartBuilder::new(chrono_tz::UTC)
            .with_goal(GoalConfig::new(95.0))
            .build(&measurements);

        let summary = &chart.summary;
        assert_eq!(summary.points, 14);
        assert!((summary.change.unwrap() + 2.6).abs() < 1e-9);
        assert!((summary.trend_per_week.unwrap() + 1.4).abs() < 1e-6);
        // 99.8 - 0.2 * d reaches 95 after 24 days from Jan 1
        let projected = summary.projected_goal_date.unwrap();
        assert!(projected >= jan(24) && projected <= jan(26));
    }

    #[test]
    fn test_series_mode_parsing() {
        assert_eq!("daily".parse::<SeriesMode>().unwrap(), SeriesMode::Daily);
        assert_eq!("RAW".parse::<SeriesMode>().unwrap(), SeriesMode::Individual);
        assert!("weekly".parse::<SeriesMode>().is_err());
    }

    #[test]
    fn test_build_is_idempotent() {
        let measurements = history(30);
        let builder = ChartBuilder::new(chrono_tz::Europe::Berlin)
            .with_goal(GoalConfig::new(90.0))
            .with_range(DateRange::new(Some(jan(10)), None));

        assert_eq!(builder.build(&measurements), builder.build(&measurements));
    }
}
