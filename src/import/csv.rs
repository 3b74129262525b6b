use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use uuid::Uuid;

use crate::error::{ImportError, Result};
use crate::import::validation::MeasurementValidator;
use crate::import::{has_extension, ImportFormat, ImportReport, RowError};
use crate::models::Measurement;
use crate::timezone;

/// CSV importer for plain entry files: one measurement per row
pub struct EntryCsvImporter {
    timezone: Tz,
    column_mapping: HashMap<String, String>,
}

impl EntryCsvImporter {
    pub fn new(timezone: Tz) -> Self {
        let mut column_mapping = HashMap::new();

        // Common column name variations
        Self::add_mapping(
            &mut column_mapping,
            "value",
            &["value", "weight", "measurement", "kg", "lbs"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "date",
            &["date", "timestamp", "time", "datetime", "recorded_at"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "note",
            &["note", "notes", "comment", "comments"],
        );
        Self::add_mapping(&mut column_mapping, "id", &["id", "uuid", "entry_id"]);

        Self {
            timezone,
            column_mapping,
        }
    }

    fn add_mapping(mapping: &mut HashMap<String, String>, standard: &str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard.to_string());
        }
    }

    fn normalize_column_name(&self, name: &str) -> String {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");

        self.column_mapping
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    /// Parse a timestamp cell. Values without an offset are local to the
    /// importer's timezone.
    pub fn parse_datetime(&self, raw: &str) -> std::result::Result<DateTime<Utc>, ImportError> {
        let trimmed = raw.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }

        let formats = [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
        ];

        for format in &formats {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return self.resolve_local(naive, raw);
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return self.resolve_local(date.and_time(NaiveTime::MIN), raw);
        }

        // Seconds since epoch
        if let Ok(seconds) = trimmed.parse::<i64>() {
            if let Some(dt) = DateTime::from_timestamp(seconds, 0) {
                return Ok(dt);
            }
        }

        Err(ImportError::InvalidDate {
            raw: raw.to_string(),
        })
    }

    fn resolve_local(
        &self,
        naive: NaiveDateTime,
        raw: &str,
    ) -> std::result::Result<DateTime<Utc>, ImportError> {
        timezone::local_to_utc(naive, &self.timezone).ok_or_else(|| ImportError::InvalidDate {
            raw: raw.to_string(),
        })
    }

    /// Import entries from any CSV source
    pub fn import_reader<R: Read>(&self, reader: R) -> Result<ImportReport> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(ImportError::from)?
            .iter()
            .map(|h| self.normalize_column_name(h))
            .collect();

        let column = |name: &str| headers.iter().position(|h| h == name);
        let value_idx = column("value").ok_or_else(|| ImportError::MissingColumn {
            column: "value".to_string(),
        })?;
        let date_idx = column("date").ok_or_else(|| ImportError::MissingColumn {
            column: "date".to_string(),
        })?;
        let note_idx = column("note");
        let id_idx = column("id");

        let mut report = ImportReport::default();

        for (index, record) in reader.records().enumerate() {
            let row = index + 2;
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    report.errors.push(RowError::new(row, e.to_string()));
                    continue;
                }
            };

            let raw_value = record.get(value_idx).unwrap_or("");
            let value = match MeasurementValidator::parse_value(raw_value) {
                Ok(value) => value,
                Err(e) => {
                    report.errors.push(RowError::new(row, e.to_string()));
                    continue;
                }
            };

            let raw_date = record.get(date_idx).unwrap_or("");
            if raw_date.is_empty() {
                report.errors.push(RowError::new(row, "Missing date"));
                continue;
            }
            let timestamp = match self.parse_datetime(raw_date) {
                Ok(ts) => ts,
                Err(e) => {
                    report.errors.push(RowError::new(row, e.to_string()));
                    continue;
                }
            };

            let mut measurement = Measurement::new(value, timestamp);
            if let Some(id) = id_idx
                .and_then(|i| record.get(i))
                .and_then(|raw| Uuid::parse_str(raw).ok())
            {
                measurement.id = id;
            }
            if let Some(note) = note_idx.and_then(|i| record.get(i)).filter(|n| !n.is_empty()) {
                measurement.note = Some(note.to_string());
            }

            report.measurements.push(measurement);
        }

        Ok(report)
    }

    fn header_columns(&self, file_path: &Path) -> Option<Vec<String>> {
        let headers = read_csv_header(file_path)?;
        Some(headers.iter().map(|h| self.normalize_column_name(h)).collect())
    }
}

/// Read only the header row of a CSV file
pub(crate) fn read_csv_header(file_path: &Path) -> Option<Vec<String>> {
    let file = File::open(file_path).ok()?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader.headers().ok()?;
    Some(headers.iter().map(|h| h.trim().to_string()).collect())
}

impl ImportFormat for EntryCsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        if !has_extension(file_path, &["csv"]) {
            return false;
        }

        self.header_columns(file_path)
            .map(|cols| cols.iter().any(|c| c == "value") && cols.iter().any(|c| c == "date"))
            .unwrap_or(false)
    }

    fn import_file(&self, file_path: &Path) -> Result<ImportReport> {
        let file = File::open(file_path)?;
        self.import_reader(file)
    }

    fn get_format_name(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_column_aliases() {
        let importer = EntryCsvImporter::new(chrono_tz::UTC);
        let data = "Weight,Recorded At,Notes\n80.5,2024-01-05 08:00:00,after run\n";

        let report = importer.import_reader(data.as_bytes()).unwrap();
        assert_eq!(report.imported(), 1);

        let m = &report.measurements[0];
        assert_eq!(m.value, 80.5);
        assert_eq!(m.timestamp, Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap());
        assert_eq!(m.note.as_deref(), Some("after run"));
    }

    #[test]
    fn test_naive_times_are_local() {
        let importer = EntryCsvImporter::new(chrono_tz::Europe::Berlin);
        let ts = importer.parse_datetime("2024-01-05 08:00:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap());

        // Explicit offsets win over the configured zone
        let ts = importer.parse_datetime("2024-01-05T08:00:00Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap());

        let ts = importer.parse_datetime("1704441600").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_bad_rows_are_reported_and_skipped() {
        let importer = EntryCsvImporter::new(chrono_tz::UTC);
        let data = "value,date\n\
                    80.5,2024-01-05T08:00:00Z\n\
                    heavy,2024-01-06T08:00:00Z\n\
                    81.0,\n\
                    81.0,someday\n\
                    NaN,2024-01-07T08:00:00Z\n";

        let report = importer.import_reader(data.as_bytes()).unwrap();
        assert_eq!(report.imported(), 1);
        assert_eq!(report.errors.len(), 4);
        assert_eq!(report.errors[0].row, 3);
        assert_eq!(report.errors[1].to_string(), "Row 4: Missing date");
        assert!(report.errors[2].reason.contains("Could not parse"));
        assert_eq!(report.errors[3].row, 6);
    }

    #[test]
    fn test_missing_value_column() {
        let importer = EntryCsvImporter::new(chrono_tz::UTC);
        let err = importer.import_reader("date,notes\n2024-01-05,x\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Missing required column: value"));
    }

    #[test]
    fn test_keeps_existing_ids() {
        let importer = EntryCsvImporter::new(chrono_tz::UTC);
        let id = Uuid::new_v4();
        let data = format!("id,value,date\n{},80.0,2024-01-05T08:00:00Z\n", id);

        let report = importer.import_reader(data.as_bytes()).unwrap();
        assert_eq!(report.measurements[0].id, id);
    }
}
