//! Import of spreadsheet exports: one row per day, up to three readings.
//!
//! Each measurement column is a fixed slot of the day. Readings are placed at
//! the slot's wall-clock time in the configured timezone.

use chrono::{Days, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{ImportError, Result};
use crate::import::csv::read_csv_header;
use crate::import::validation::MeasurementValidator;
use crate::import::{has_extension, ImportFormat, ImportReport, RowError};
use crate::models::Measurement;
use crate::timezone;

/// Wall-clock times assigned to the three measurement columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTimes {
    pub morning: NaiveTime,
    pub noon: NaiveTime,
    pub evening: NaiveTime,
}

impl Default for SlotTimes {
    fn default() -> Self {
        SlotTimes {
            morning: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            noon: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
            evening: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl SlotTimes {
    fn slots(&self) -> [(NaiveTime, &'static str); 3] {
        [
            (self.morning, "Morning"),
            (self.noon, "Noon"),
            (self.evening, "Evening"),
        ]
    }
}

/// Day zero of spreadsheet serial dates
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Parse a date cell.
///
/// Tried in order: `yyyy-MM-dd`, `MM/dd/yyyy`, `dd.MM.yyyy`, then a
/// spreadsheet serial number.
pub fn parse_sheet_date(raw: &str) -> std::result::Result<NaiveDate, ImportError> {
    let trimmed = raw.trim();

    for format in ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }

    if let Ok(serial) = trimmed.parse::<f64>() {
        if serial.is_finite() && serial >= 1.0 {
            if let Some(date) = serial_epoch().checked_add_days(Days::new(serial.trunc() as u64)) {
                return Ok(date);
            }
        }
    }

    Err(ImportError::InvalidDate {
        raw: raw.to_string(),
    })
}

/// Normalized header name: lowercase with spaces and underscores removed
fn normalize_header(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect()
}

struct SheetColumns {
    date: usize,
    measurements: [Option<usize>; 3],
}

impl SheetColumns {
    fn locate(headers: &[String]) -> Option<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let find = |name: &str| normalized.iter().position(|h| h == name);

        let columns = SheetColumns {
            date: find("date")?,
            measurements: [find("measurement1"), find("measurement2"), find("measurement3")],
        };
        columns.measurements.iter().any(Option::is_some).then_some(columns)
    }
}

/// Importer for the date + measurement 1/2/3 spreadsheet layout
pub struct SpreadsheetImporter {
    timezone: Tz,
    slots: SlotTimes,
}

impl SpreadsheetImporter {
    pub fn new(timezone: Tz, slots: SlotTimes) -> Self {
        SpreadsheetImporter { timezone, slots }
    }

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
            .map(str::to_string)
            .collect();

        let rows = reader.records().map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect::<Vec<String>>())
                .map_err(|e| e.to_string())
        });

        self.import_rows(&headers, rows)
    }

    /// Apply the sheet row rules to already-split rows.
    ///
    /// Rows are numbered as the user sees them in the sheet: the header is
    /// row 1. A row that could not be read at all carries its reason instead
    /// of cells.
    pub(crate) fn import_rows<I>(&self, headers: &[String], rows: I) -> Result<ImportReport>
    where
        I: IntoIterator<Item = std::result::Result<Vec<String>, String>>,
    {
        let columns = SheetColumns::locate(headers).ok_or_else(|| {
            let has_date = headers.iter().any(|h| normalize_header(h) == "date");
            ImportError::MissingColumn {
                column: if has_date { "measurement 1" } else { "date" }.to_string(),
            }
        })?;

        let mut report = ImportReport::default();
        let mut row_count = 0usize;

        for (index, record) in rows.into_iter().enumerate() {
            row_count += 1;
            let row = index + 2;
            let record = match record {
                Ok(record) => record,
                Err(reason) => {
                    report.errors.push(RowError::new(row, reason));
                    continue;
                }
            };
            let cell = |idx: usize| record.get(idx).map(|c| c.trim()).unwrap_or("");

            let raw_date = cell(columns.date);
            if raw_date.is_empty() {
                report.errors.push(RowError::new(row, "Missing date"));
                continue;
            }

            let cells: Vec<(usize, &str)> = columns
                .measurements
                .iter()
                .enumerate()
                .filter_map(|(slot, idx)| {
                    let value = cell((*idx)?);
                    (!value.is_empty()).then_some((slot, value))
                })
                .collect();

            if cells.is_empty() {
                report.errors.push(RowError::new(row, "No measurements found"));
                continue;
            }

            let date = match parse_sheet_date(raw_date) {
                Ok(date) => date,
                Err(e) => {
                    report.errors.push(RowError::new(row, e.to_string()));
                    continue;
                }
            };

            let slots = self.slots.slots();
            for (slot, raw) in cells {
                let value = match MeasurementValidator::parse_value(raw) {
                    Ok(value) => value,
                    Err(e) => {
                        report
                            .errors
                            .push(RowError::new(row, format!("Measurement {}: {}", slot + 1, e)));
                        continue;
                    }
                };

                let (time, label) = slots[slot];
                let Some(timestamp) = timezone::local_to_utc(date.and_time(time), &self.timezone)
                else {
                    report.errors.push(RowError::new(
                        row,
                        format!("Measurement {}: no such local time {} {}", slot + 1, date, time),
                    ));
                    continue;
                };

                report.measurements.push(
                    Measurement::new(value, timestamp)
                        .with_note(format!("Imported from spreadsheet ({})", label)),
                );
            }
        }

        if row_count == 0 {
            return Err(ImportError::Empty {
                origin: "spreadsheet".to_string(),
            }
            .into());
        }

        Ok(report)
    }
}

impl ImportFormat for SpreadsheetImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        if !has_extension(file_path, &["csv", "tsv", "txt"]) {
            return false;
        }

        read_csv_header(file_path)
            .map(|headers| SheetColumns::locate(&headers).is_some())
            .unwrap_or(false)
    }

    fn import_file(&self, file_path: &Path) -> Result<ImportReport> {
        let file = File::open(file_path)?;
        self.import_reader(file).map_err(|e| match e {
            crate::error::WeightRsError::Import(ImportError::Empty { .. }) => ImportError::Empty {
                origin: file_path.display().to_string(),
            }
            .into(),
            other => other,
        })
    }

    fn get_format_name(&self) -> &'static str {
        "spreadsheet"
    }
}
