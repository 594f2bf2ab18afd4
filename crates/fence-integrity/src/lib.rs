//! Trust signals for client-submitted positions.
//!
//! Everything here is pure: a sample plus the current time in, a report out.

pub mod analysis;
pub mod fingerprint;
pub mod spoofing;
pub mod validation;

pub use analysis::{analyze_metadata, SecurityAnalysis, SecurityWarning};
pub use fingerprint::{fingerprint, integrity_hash, verify_integrity};
pub use spoofing::{detect_spoofing, ExpectedField, SpoofingAssessment, SpoofingFactor};
pub use validation::{validate_metadata, MetadataValidation, ValidationIssue};

use fence_config::IntegrityPolicy;
use fence_core::{EpochMillis, LocationSample};
use serde::{Deserialize, Serialize};

/// Everything the caller stores next to an admission decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub analysis: SecurityAnalysis,
    pub spoofing: SpoofingAssessment,
    pub validation: MetadataValidation,
    pub fingerprint: String,
}

pub fn assess(
    sample: &LocationSample,
    now_ms: EpochMillis,
    policy: &IntegrityPolicy,
) -> IntegrityReport {
    let report = IntegrityReport {
        analysis: analyze_metadata(sample, now_ms, policy),
        spoofing: detect_spoofing(sample, policy),
        validation: validate_metadata(sample, now_ms, policy),
        fingerprint: fingerprint(sample),
    };
    tracing::debug!(
        score = report.analysis.score,
        reliability = %report.analysis.reliability,
        spoofing_risk = %report.spoofing.risk,
        metadata_valid = report.validation.valid,
        "assessed location integrity"
    );
    report
}
