use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{ImportError, Result};
use crate::models::Measurement;

pub mod csv;
pub mod excel;
pub mod json;
pub mod spreadsheet;
pub mod validation;

pub use self::spreadsheet::SlotTimes;

/// Trait for importing measurements from different file formats
pub trait ImportFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import measurements from the file
    fn import_file(&self, file_path: &Path) -> Result<ImportReport>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// A row that was skipped during import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based row number; the header is row 1
    pub row: usize,
    pub reason: String,
}

impl RowError {
    pub fn new(row: usize, reason: impl Into<String>) -> Self {
        RowError {
            row,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.reason)
    }
}

/// Outcome of importing one file: what was read and what was skipped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub measurements: Vec<Measurement>,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.measurements.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Log skipped rows at warn level
    pub(crate) fn log_errors(&self, format: &str) {
        for error in &self.errors {
            warn!(format, row = error.row, reason = %error.reason, "Skipped row");
        }
    }
}

/// Manager for coordinating different import formats
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl ImportManager {
    /// Create a new import manager with all available importers.
    ///
    /// Order matters: workbooks are matched by extension first, then the
    /// spreadsheet layout is checked before the plain entry layout because
    /// both are CSV.
    pub fn new(timezone: Tz, slots: SlotTimes) -> Self {
        let importers: Vec<Box<dyn ImportFormat>> = vec![
            Box::new(excel::ExcelImporter::new(timezone, slots)),
            Box::new(spreadsheet::SpreadsheetImporter::new(timezone, slots)),
            Box::new(csv::EntryCsvImporter::new(timezone)),
            Box::new(json::JsonImporter::new()),
        ];

        Self { importers }
    }

    /// Import a single file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path) -> Result<ImportReport> {
        for importer in &self.importers {
            if importer.can_import(file_path) {
                return self.run(importer.as_ref(), file_path);
            }
        }

        Err(ImportError::UnsupportedFormat {
            format: extension_of(file_path),
        }
        .into())
    }

    /// Import a file with an explicitly named format
    pub fn import_with_format(&self, file_path: &Path, format: &str) -> Result<ImportReport> {
        let importer = self
            .importers
            .iter()
            .find(|i| i.get_format_name().eq_ignore_ascii_case(format))
            .ok_or_else(|| ImportError::UnsupportedFormat {
                format: format.to_string(),
            })?;

        self.run(importer.as_ref(), file_path)
    }

    /// Names of all registered formats
    pub fn format_names(&self) -> Vec<&'static str> {
        self.importers.iter().map(|i| i.get_format_name()).collect()
    }

    fn run(&self, importer: &dyn ImportFormat, file_path: &Path) -> Result<ImportReport> {
        let format = importer.get_format_name();
        info!(file = %file_path.display(), format, "Importing measurements");

        let report = importer.import_file(file_path)?;
        report.log_errors(format);

        info!(
            file = %file_path.display(),
            imported = report.imported(),
            skipped = report.errors.len(),
            "Import finished"
        );

        Ok(report)
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

/// True when the file's extension matches one of `extensions`
pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = extension_of(path);
    extensions.iter().any(|e| *e == ext)
}
