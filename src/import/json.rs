use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::error::{ImportError, Result};
use crate::import::validation::MeasurementValidator;
use crate::import::{has_extension, ImportFormat, ImportReport, RowError};
use crate::models::Measurement;

/// Record layout accepted from JSON entry dumps
#[derive(Debug, Deserialize)]
struct MeasurementRecord {
    #[serde(default)]
    id: Option<Uuid>,
    value: f64,
    #[serde(alias = "date")]
    timestamp: DateTime<Utc>,
    #[serde(default, alias = "notes")]
    note: Option<String>,
}

/// Importer for a JSON array of measurement records
pub struct JsonImporter;

impl JsonImporter {
    pub fn new() -> Self {
        JsonImporter
    }

    pub fn import_str(&self, content: &str) -> Result<ImportReport> {
        let records: Vec<MeasurementRecord> =
            serde_json::from_str(content).map_err(|e| ImportError::ParseError {
                format: "json".to_string(),
                reason: e.to_string(),
            })?;

        let mut report = ImportReport::default();
        for (index, record) in records.into_iter().enumerate() {
            if let Err(e) = MeasurementValidator::check_value(record.value) {
                report.errors.push(RowError::new(index + 1, e.to_string()));
                continue;
            }

            report.measurements.push(Measurement {
                id: record.id.unwrap_or_else(Uuid::new_v4),
                value: record.value,
                timestamp: record.timestamp,
                note: record.note,
            });
        }

        Ok(report)
    }
}

impl Default for JsonImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for JsonImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, &["json"])
    }

    fn import_file(&self, file_path: &Path) -> Result<ImportReport> {
        let content = fs::read_to_string(file_path)?;
        self.import_str(&content)
    }

    fn get_format_name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_records() {
        let content = r#"[
            {"value": 80.5, "timestamp": "2024-01-05T08:00:00Z", "note": "morning"},
            {"value": 80.1, "date": "2024-01-06T08:00:00+01:00", "notes": "alias fields"}
        ]"#;

        let report = JsonImporter::new().import_str(content).unwrap();
        assert_eq!(report.imported(), 2);
        assert_eq!(report.measurements[0].note.as_deref(), Some("morning"));
        assert_eq!(
            report.measurements[1].timestamp.to_rfc3339(),
            "2024-01-06T07:00:00+00:00"
        );
    }

    #[test]
    fn test_non_numeric_value_is_a_parse_error() {
        let content = r#"[{"value": "heavy", "timestamp": "2024-01-05T08:00:00Z"}]"#;
        let err = JsonImporter::new().import_str(content).unwrap_err();
        assert!(err.to_string().contains("Parse error in json"));
    }
}
