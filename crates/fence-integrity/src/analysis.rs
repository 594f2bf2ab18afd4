use fence_config::IntegrityPolicy;
use fence_core::{older_than, parse_timestamp, EpochMillis, LocationSample, Reliability};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityWarning {
    PoorAccuracy,
    ModerateAccuracy,
    DeviceMoving,
    NoAltitude,
    StaleTimestamp,
    InvalidTimestamp,
}

impl SecurityWarning {
    pub fn penalty(self) -> u8 {
        match self {
            Self::PoorAccuracy => 30,
            Self::ModerateAccuracy => 15,
            Self::DeviceMoving => 25,
            Self::NoAltitude => 10,
            Self::StaleTimestamp => 20,
            Self::InvalidTimestamp => 15,
        }
    }
}

impl fmt::Display for SecurityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::PoorAccuracy => "poor GPS accuracy",
            Self::ModerateAccuracy => "moderate GPS accuracy",
            Self::DeviceMoving => "device was moving during location capture",
            Self::NoAltitude => "no altitude data (lower GPS quality)",
            Self::StaleTimestamp => "location data is stale",
            Self::InvalidTimestamp => "invalid timestamp format",
        };
        write!(f, "{}", value)
    }
}

/// Trust score for one sample. Recomputed for every sample, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAnalysis {
    pub score: u8,
    pub warnings: BTreeSet<SecurityWarning>,
    pub reliability: Reliability,
    pub is_suspicious: bool,
}

impl SecurityAnalysis {
    pub fn describe_warnings(&self) -> String {
        self.warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn analyze_metadata(
    sample: &LocationSample,
    now_ms: EpochMillis,
    policy: &IntegrityPolicy,
) -> SecurityAnalysis {
    let mut warnings = BTreeSet::new();

    if sample.accuracy_m > policy.poor_accuracy_m {
        warnings.insert(SecurityWarning::PoorAccuracy);
    } else if sample.accuracy_m > policy.moderate_accuracy_m {
        warnings.insert(SecurityWarning::ModerateAccuracy);
    }

    if sample.speed_mps.is_some_and(|speed| speed > policy.moving_speed_mps) {
        warnings.insert(SecurityWarning::DeviceMoving);
    }

    if sample.altitude_m.is_none() {
        warnings.insert(SecurityWarning::NoAltitude);
    }

    if let Some(raw) = sample.captured_at.as_deref() {
        match parse_timestamp(raw) {
            Some(captured) if older_than(captured, now_ms, policy.stale_after_secs) => {
                warnings.insert(SecurityWarning::StaleTimestamp);
            }
            Some(_) => {}
            None => {
                warnings.insert(SecurityWarning::InvalidTimestamp);
            }
        }
    }

    let penalty: u32 = warnings.iter().map(|w| u32::from(w.penalty())).sum();
    let score = 100u32.saturating_sub(penalty) as u8;
    let reliability = Reliability::from_score(score);

    SecurityAnalysis {
        score,
        warnings,
        reliability,
        is_suspicious: reliability == Reliability::Low,
    }
}
