use crate::error::ImportError;
use crate::models::Measurement;

/// Gatekeeper for measurement values entering the analytics core.
///
/// The analytics functions assume finite numbers; anything else is stopped
/// here, at ingestion.
pub struct MeasurementValidator;

impl MeasurementValidator {
    /// Parse a raw cell into a finite value
    pub fn parse_value(raw: &str) -> Result<f64, ImportError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ImportError::InvalidValue {
                raw: raw.to_string(),
                reason: "value is empty".to_string(),
            });
        }

        let value: f64 = trimmed.parse().map_err(|_| ImportError::InvalidValue {
            raw: raw.to_string(),
            reason: "not a number".to_string(),
        })?;

        Self::check_value(value)
    }

    /// Reject NaN and infinities
    pub fn check_value(value: f64) -> Result<f64, ImportError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ImportError::InvalidValue {
                raw: value.to_string(),
                reason: "not a finite number".to_string(),
            })
        }
    }

    /// Validate an already-built measurement
    pub fn validate(measurement: &Measurement) -> Result<(), ImportError> {
        Self::check_value(measurement.value).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_value() {
        assert_eq!(MeasurementValidator::parse_value("80.5").unwrap(), 80.5);
        assert_eq!(MeasurementValidator::parse_value(" 79 ").unwrap(), 79.0);
    }

    #[test]
    fn test_rejects_non_numeric() {
        for raw in ["", "   ", "heavy", "80,5", "NaN", "inf", "-infinity"] {
            assert!(
                matches!(
                    MeasurementValidator::parse_value(raw),
                    Err(ImportError::InvalidValue { .. })
                ),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_validate_measurement() {
        assert!(MeasurementValidator::validate(&Measurement::new(80.0, Utc::now())).is_ok());
        assert!(MeasurementValidator::validate(&Measurement::new(f64::NAN, Utc::now())).is_err());
    }
}
