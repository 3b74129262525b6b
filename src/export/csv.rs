use std::io::Write;

use crate::chart::ChartData;
use crate::error::ExportError;
use crate::models::Measurement;

fn cell(value: Option<f64>) -> String {
    value.map_or(String::new(), |v| format!("{:.3}", v))
}

/// Chart rows as CSV, undefined series values left empty
pub fn write_chart<W: Write>(chart: &ChartData, writer: W) -> Result<(), ExportError> {
    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record(["Date", "Value", "Trend", "Floor", "Ceiling", "Ideal"])?;

    for row in chart.rows() {
        csv.write_record([
            row.label,
            format!("{:.2}", row.value),
            cell(row.trend),
            cell(row.floor),
            cell(row.ceiling),
            cell(row.ideal),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Measurements in the layout the entry importer reads back
pub fn write_measurements<W: Write>(
    measurements: &[Measurement],
    writer: W,
) -> Result<(), ExportError> {
    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record(["id", "value", "date", "notes"])?;

    for m in measurements {
        csv.write_record([
            m.id.to_string(),
            m.value.to_string(),
            m.timestamp.to_rfc3339(),
            m.note.clone().unwrap_or_default(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartBuilder;
    use crate::corridor::GoalConfig;
    use chrono::{TimeZone, Utc};

    fn week_of_measurements() -> Vec<Measurement> {
        (1..=8)
            .map(|d| Measurement::new(100.0, Utc.with_ymd_and_hms(2024, 1, d, 8, 0, 0).unwrap()))
            .collect()
    }

    #[test]
    fn test_chart_csv_leaves_warm_up_cells_empty() {
        let chart = ChartBuilder::new(chrono_tz::UTC)
            .with_goal(GoalConfig::new(90.0))
            .build(&week_of_measurements());

        let mut out = Vec::new();
        write_chart(&chart, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Date,Value,Trend,Floor,Ceiling,Ideal");
        assert_eq!(lines[1], "2024-01-01,100.00,100.000,,,");
        assert_eq!(lines[7], "2024-01-07,100.00,100.000,99.625,100.375,100.000");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_measurement_csv_quotes_notes() {
        let m = Measurement::new(80.5, Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap())
            .with_note("after run, before coffee");

        let mut out = Vec::new();
        write_measurements(&[m.clone()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("id,value,date,notes\n"));
        assert!(text.contains(&format!(
            "{},80.5,2024-01-05T08:00:00+00:00,\"after run, before coffee\"",
            m.id
        )));
    }
}
