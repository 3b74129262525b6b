//! Integration tests for import error reporting
//!
//! Malformed rows are reported with their row numbers while the rest of the
//! file still imports. Whole-file problems surface as typed errors.

use std::io::Write;
use tempfile::Builder;
use weightrs::error::{ErrorSeverity, ImportError, WeightRsError};
use weightrs::import::{ImportManager, SlotTimes};

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn manager() -> ImportManager {
    ImportManager::new(chrono_tz::UTC, SlotTimes::default())
}

#[test]
fn test_spreadsheet_row_errors_keep_valid_cells() {
    let file = write_temp(
        ".csv",
        "Date,Measurement 1,Measurement 2,Measurement 3\n\
         2024-01-05,80.1,eighty,80.7\n\
         ,80.0,,\n\
         2024-01-07,,,\n\
         2024-13-45,80.0,,\n",
    );

    let report = manager().import_file(file.path()).unwrap();

    // Row 2 keeps morning and evening, loses noon
    assert_eq!(report.imported(), 2);
    assert_eq!(report.measurements[1].value, 80.7);
    assert_eq!(
        report.measurements[1].note.as_deref(),
        Some("Imported from spreadsheet (Evening)")
    );

    let rows: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![2, 3, 4, 5]);
    assert!(report.errors[0].reason.starts_with("Measurement 2:"));
    assert_eq!(report.errors[1].reason, "Missing date");
    assert_eq!(report.errors[2].reason, "No measurements found");
    assert!(report.errors[3].reason.contains("Invalid date format"));
    assert_eq!(report.errors[3].to_string(), format!("Row 5: {}", report.errors[3].reason));
}

#[test]
fn test_entry_rows_with_bad_values_are_skipped() {
    let file = write_temp(
        ".csv",
        "value,date\n\
         80.1,2024-01-05 08:00\n\
         NaN,2024-01-06 08:00\n\
         80.3,yesterday\n\
         80.4,\n",
    );

    let report = manager().import_file(file.path()).unwrap();
    assert_eq!(report.imported(), 1);
    assert_eq!(report.errors.len(), 3);
    assert!(report.errors[0].reason.contains("not a finite number"));
    assert!(report.errors[1].reason.contains("Invalid date format"));
    assert_eq!(report.errors[2].reason, "Missing date");
}

#[test]
fn test_unsupported_format_error() {
    let file = write_temp(".numbers", "binary");
    let err = manager().import_file(file.path()).unwrap_err();

    assert!(matches!(
        err,
        WeightRsError::Import(ImportError::UnsupportedFormat { ref format }) if format == "numbers"
    ));
    assert_eq!(err.severity(), ErrorSeverity::Error);
    assert!(err.user_message().contains("cannot be imported"));
}

#[test]
fn test_missing_column_error() {
    let file = write_temp(".txt", "when,how much\n2024-01-05,80\n");
    let err = manager()
        .import_with_format(file.path(), "csv")
        .unwrap_err();

    assert!(matches!(
        err,
        WeightRsError::Import(ImportError::MissingColumn { .. })
    ));
}

#[test]
fn test_empty_spreadsheet_error() {
    let file = write_temp(".csv", "Date,Measurement 1\n");
    let err = manager().import_file(file.path()).unwrap_err();

    assert!(matches!(err, WeightRsError::Import(ImportError::Empty { .. })));
    assert_eq!(err.severity(), ErrorSeverity::Warning);
}

#[test]
fn test_unknown_format_name() {
    let file = write_temp(".csv", "value,date\n80,2024-01-05\n");
    let err = manager().import_with_format(file.path(), "xml").unwrap_err();
    assert!(err.to_string().contains("Unsupported format: xml"));
}
