//! Unified error hierarchy for weightrs
//!
//! Insufficient history is never an error here: the analytics functions return
//! empty or partially undefined series instead. Errors cover the edges of the
//! system: reading entry files, writing exports, loading settings and parsing
//! timezone identifiers.

use thiserror::Error;

/// Top-level error type for all weightrs operations
#[derive(Debug, Error)]
pub enum WeightRsError {
    /// Entry file import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Chart and measurement export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Settings file errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown or malformed timezone identifier
    #[error("Timezone error: {0}")]
    Timezone(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading measurement files
#[derive(Debug, Error)]
pub enum ImportError {
    /// No importer accepts the file
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// The file could not be parsed at all
    #[error("Parse error in {format}: {reason}")]
    ParseError { format: String, reason: String },

    /// A required column is absent from the header
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// A measurement value is not a finite number
    #[error("Invalid value {raw:?}: {reason}")]
    InvalidValue { raw: String, reason: String },

    /// A date cell could not be parsed with any supported format
    #[error("Invalid date format - Could not parse {raw:?}")]
    InvalidDate { raw: String },

    /// The input contains no data rows
    #[error("No data found in {origin}")]
    Empty { origin: String },
}

/// Errors raised while writing exports
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised by the settings layer
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key passed to get/set does not exist
    #[error("Unknown configuration key: {key}")]
    UnknownKey { key: String },

    /// Value could not be converted to the key's type
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// Goal settings failed validation
    #[error("Invalid goal setting {field}: {reason}")]
    InvalidGoal { field: String, reason: String },
}

/// Result type alias for weightrs operations
pub type Result<T> = std::result::Result<T, WeightRsError>;

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::ParseError {
            format: "csv".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

impl WeightRsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WeightRsError::Import(ImportError::InvalidValue { .. }) => ErrorSeverity::Warning,
            WeightRsError::Import(ImportError::InvalidDate { .. }) => ErrorSeverity::Warning,
            WeightRsError::Import(ImportError::Empty { .. }) => ErrorSeverity::Warning,
            WeightRsError::Validation(_) => ErrorSeverity::Warning,
            WeightRsError::Configuration(_) => ErrorSeverity::Error,
            WeightRsError::Timezone(_) => ErrorSeverity::Error,
            WeightRsError::Io(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            WeightRsError::Import(ImportError::UnsupportedFormat { format }) => {
                format!(
                    "Files of type '{}' cannot be imported. Use CSV, JSON or an Excel workbook.",
                    format
                )
            }
            WeightRsError::Import(ImportError::MissingColumn { column }) => {
                format!("The file has no '{}' column.", column)
            }
            WeightRsError::Import(ImportError::Empty { origin }) => {
                format!("{} contains no measurements to import.", origin)
            }
            WeightRsError::Timezone(name) => {
                format!("Unknown timezone '{}'. Use an IANA name such as Europe/Berlin.", name)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = WeightRsError::Import(ImportError::InvalidDate {
            raw: "32.13.2024".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = WeightRsError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_messages() {
        let err = WeightRsError::Timezone("Mars/Olympus".to_string());
        assert!(err.user_message().contains("Unknown timezone"));

        let err = WeightRsError::Import(ImportError::MissingColumn {
            column: "date".to_string(),
        });
        assert!(err.user_message().contains("'date'"));
    }

    #[test]
    fn test_invalid_date_message_matches_row_report() {
        let err = ImportError::InvalidDate {
            raw: "tomorrow".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date format - Could not parse \"tomorrow\""
        );
    }
}
