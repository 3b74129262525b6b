use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::chart::ChartData;
use crate::error::ExportError;
use crate::models::Measurement;

pub mod csv;
pub mod json;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Result<Self, ExportError> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }

    /// Guess the format from an output path's extension
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_str(ext)
    }
}

/// Write chart rows to a file
pub fn export_chart<P: AsRef<Path>>(
    chart: &ChartData,
    format: ExportFormat,
    output_path: P,
) -> Result<(), ExportError> {
    let path = output_path.as_ref();
    let writer = BufWriter::new(File::create(path)?);

    match format {
        ExportFormat::Csv => csv::write_chart(chart, writer)?,
        ExportFormat::Json => json::write_json(chart, writer)?,
    }

    info!(path = %path.display(), rows = chart.values.len(), ?format, "Exported chart data");
    Ok(())
}

/// Write measurements in the entry file layout
pub fn export_measurements<P: AsRef<Path>>(
    measurements: &[Measurement],
    format: ExportFormat,
    output_path: P,
) -> Result<(), ExportError> {
    let path = output_path.as_ref();
    let writer = BufWriter::new(File::create(path)?);

    match format {
        ExportFormat::Csv => csv::write_measurements(measurements, writer)?,
        ExportFormat::Json => json::write_json(measurements, writer)?,
    }

    info!(
        path = %path.display(),
        measurements = measurements.len(),
        ?format,
        "Exported measurements"
    );
    Ok(())
}
