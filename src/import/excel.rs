//! Import of Excel and OpenDocument workbooks.
//!
//! The first worksheet is read with the same layout and row rules as a
//! spreadsheet CSV export: a date column plus up to three measurement columns.

use calamine::{open_workbook_auto, Data, Reader};
use chrono_tz::Tz;
use std::path::Path;
use tracing::debug;

use crate::error::{ImportError, Result, WeightRsError};
use crate::import::spreadsheet::{SlotTimes, SpreadsheetImporter};
use crate::import::{has_extension, ImportFormat, ImportReport};

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Workbook importer
pub struct ExcelImporter {
    sheet: SpreadsheetImporter,
}

impl ExcelImporter {
    pub fn new(timezone: Tz, slots: SlotTimes) -> Self {
        Self {
            sheet: SpreadsheetImporter::new(timezone, slots),
        }
    }

    fn parse_error(reason: impl ToString) -> WeightRsError {
        ImportError::ParseError {
            format: "excel".to_string(),
            reason: reason.to_string(),
        }
        .into()
    }
}

/// Text form of a cell as the row rules expect it.
///
/// Date-formatted cells become their serial number so they go through the
/// same serial date path as a numeric date cell.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.split('T').next().unwrap_or(s).to_string(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

impl ImportFormat for ExcelImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, &WORKBOOK_EXTENSIONS)
    }

    fn import_file(&self, file_path: &Path) -> Result<ImportReport> {
        let mut workbook = open_workbook_auto(file_path).map_err(Self::parse_error)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Self::parse_error("workbook has no worksheets"))?
            .map_err(Self::parse_error)?;

        debug!(
            file = %file_path.display(),
            rows = range.height(),
            columns = range.width(),
            "Read first worksheet"
        );

        let mut rows = range.rows();
        let empty = || -> WeightRsError {
            ImportError::Empty {
                origin: file_path.display().to_string(),
            }
            .into()
        };

        let headers: Vec<String> = rows.next().ok_or_else(empty)?.iter().map(cell_text).collect();
        let cells = rows.map(|row| Ok::<Vec<String>, String>(row.iter().map(cell_text).collect()));

        self.sheet.import_rows(&headers, cells).map_err(|e| match e {
            WeightRsError::Import(ImportError::Empty { .. }) => empty(),
            other => other,
        })
    }

    fn get_format_name(&self) -> &'static str {
        "excel"
    }
}
