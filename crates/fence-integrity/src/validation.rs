use fence_config::IntegrityPolicy;
use fence_core::{age_ms, parse_timestamp, EpochMillis, LocationSample};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssue {
    MissingTimestamp,
    NegativeAccuracy,
    NonFiniteValue,
    InvalidTimestampFormat,
    InvalidLatitudeRange,
    InvalidLongitudeRange,
    VeryPoorAccuracy,
    OldTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValidation {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// Completeness and consistency check of a submission. Errors make the
/// metadata invalid; warnings are advisory.
pub fn validate_metadata(
    sample: &LocationSample,
    now_ms: EpochMillis,
    policy: &IntegrityPolicy,
) -> MetadataValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if ![sample.latitude, sample.longitude, sample.accuracy_m]
        .iter()
        .all(|value| value.is_finite())
    {
        errors.push(ValidationIssue::NonFiniteValue);
    }

    if sample.accuracy_m < 0.0 {
        errors.push(ValidationIssue::NegativeAccuracy);
    } else if sample.accuracy_m > policy.max_reported_accuracy_m {
        warnings.push(ValidationIssue::VeryPoorAccuracy);
    }

    match sample.captured_at.as_deref() {
        None => errors.push(ValidationIssue::MissingTimestamp),
        Some(raw) => match parse_timestamp(raw) {
            Some(captured) => {
                let limit_ms = policy.old_timestamp_secs.saturating_mul(1000);
                if age_ms(captured, now_ms).unsigned_abs() > limit_ms {
                    warnings.push(ValidationIssue::OldTimestamp);
                }
            }
            None => errors.push(ValidationIssue::InvalidTimestampFormat),
        },
    }

    if !(-90.0..=90.0).contains(&sample.latitude) {
        errors.push(ValidationIssue::InvalidLatitudeRange);
    }
    if !(-180.0..=180.0).contains(&sample.longitude) {
        errors.push(ValidationIssue::InvalidLongitudeRange);
    }

    MetadataValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs_after: u64) -> EpochMillis {
        let captured = parse_timestamp("2024-03-01T10:15:30Z").unwrap();
        captured.timestamp_millis() as u64 + secs_after * 1000
    }

    #[test]
    fn complete_sample_is_valid() {
        let sample = LocationSample::new(40.7129, -74.006, 8.0)
            .with_captured_at("2024-03-01T10:15:30Z");
        let result = validate_metadata(&sample, at(10), &IntegrityPolicy::default());
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn reports_errors_and_warnings_separately() {
        let sample = LocationSample::new(95.0, -74.006, -1.0);
        let result = validate_metadata(&sample, at(10), &IntegrityPolicy::default());
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![
                ValidationIssue::NegativeAccuracy,
                ValidationIssue::MissingTimestamp,
                ValidationIssue::InvalidLatitudeRange,
            ]
        );

        let sample = LocationSample::new(40.7129, -74.006, 1500.0)
            .with_captured_at("2024-03-01T10:15:30Z");
        let result = validate_metadata(&sample, at(3601), &IntegrityPolicy::default());
        assert!(result.valid);
        assert_eq!(
            result.warnings,
            vec![ValidationIssue::VeryPoorAccuracy, ValidationIssue::OldTimestamp]
        );
    }

    #[test]
    fn future_timestamps_are_also_old() {
        let sample = LocationSample::new(40.7129, -74.006, 8.0)
            .with_captured_at("2024-03-01T12:15:30Z");
        let result = validate_metadata(&sample, at(0), &IntegrityPolicy::default());
        assert_eq!(result.warnings, vec![ValidationIssue::OldTimestamp]);
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        let sample = LocationSample::new(40.7129, -74.006, 8.0)
            .with_captured_at("03/01/2024");
        let result = validate_metadata(&sample, at(0), &IntegrityPolicy::default());
        assert_eq!(result.errors, vec![ValidationIssue::InvalidTimestampFormat]);
    }
}
