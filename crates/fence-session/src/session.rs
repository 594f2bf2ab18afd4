use fence_config::ConfirmationPolicy;
use fence_core::{
    datetime_from_millis, EpochMillis, LocationSample, Reliability, SessionId, SessionKey,
};
use fence_geo::{haversine_m, Coordinate, CoordinateError};
use fence_integrity::{integrity_hash, SecurityAnalysis};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Meters per degree used for the spread of confirmation samples.
const SPREAD_METERS_PER_DEGREE: f64 = 111_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Collecting,
    Complete,
    Expired,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Collecting => "collecting",
            Self::Complete => "complete",
            Self::Expired => "expired",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfirmationRejection {
    #[error("confirmation session is already {0}")]
    SessionClosed(SessionState),
    #[error("confirmation session expired. Please start over.")]
    SessionExpired,
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(#[from] CoordinateError),
    #[error("GPS accuracy must be a non-negative number of meters (got {0})")]
    InvalidAccuracy(f64),
    #[error("GPS accuracy too low: ±{accuracy_m}m (required: ≤{max_m}m)")]
    AccuracyTooLow { accuracy_m: f64, max_m: f64 },
    #[error("GPS accuracy suspiciously high: ±{0}m (potential spoofing)")]
    AccuracyImplausible(f64),
    #[error("please wait {wait_secs} more seconds before next confirmation")]
    TooSoon { wait_secs: u64 },
    #[error(
        "confirmation session expired after {elapsed_secs}s without a sample. Please start over."
    )]
    Stale { elapsed_secs: u64 },
    #[error(
        "location drift too high: {drift_m:.1}m (max: {max_m}m). Please stay in the same location."
    )]
    Drift { drift_m: f64, max_m: f64 },
    #[error("suspicious location data detected: {0}")]
    Suspicious(String),
}

impl ConfirmationRejection {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::SessionClosed(_) => "session_closed",
            Self::SessionExpired => "session_expired",
            Self::InvalidCoordinates(_) => "invalid_coordinates",
            Self::InvalidAccuracy(_) => "invalid_accuracy",
            Self::AccuracyTooLow { .. } => "accuracy_too_low",
            Self::AccuracyImplausible(_) => "accuracy_implausible",
            Self::TooSoon { .. } => "too_soon",
            Self::Stale { .. } => "stale_session",
            Self::Drift { .. } => "drift_exceeded",
            Self::Suspicious(_) => "suspicious_metadata",
        }
    }

    /// The session cannot accept further samples after this rejection.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            Self::SessionClosed(_) | Self::SessionExpired | Self::Stale { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub sample: LocationSample,
    pub analysis: SecurityAnalysis,
    pub recorded_at_ms: EpochMillis,
}

/// The trusted reference produced by a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub average_accuracy_m: f64,
    pub consistency_score: f64,
    pub confirmation_count: usize,
    pub integrity_hash: String,
    pub locked_at_ms: EpochMillis,
}

impl LockedLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub total_confirmations: usize,
    pub duration_secs: f64,
    pub best_accuracy_m: f64,
    pub worst_accuracy_m: f64,
    pub average_accuracy_m: f64,
    pub average_security_score: f64,
    pub all_confirmations_reliable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ConfirmationOutcome {
    Recorded {
        confirmation: usize,
        remaining: usize,
    },
    Locked {
        location: LockedLocation,
        summary: SessionSummary,
    },
}

#[derive(Debug, Clone)]
pub struct ConfirmationSession {
    id: SessionId,
    key: SessionKey,
    created_at_ms: EpochMillis,
    state: SessionState,
    confirmations: Vec<Confirmation>,
}

impl ConfirmationSession {
    pub fn new(key: SessionKey, created_at_ms: EpochMillis) -> Self {
        Self {
            id: SessionId::new(),
            key,
            created_at_ms,
            state: SessionState::Collecting,
            confirmations: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn created_at_ms(&self) -> EpochMillis {
        self.created_at_ms
    }

    pub fn confirmations(&self) -> &[Confirmation] {
        &self.confirmations
    }

    pub fn is_expired(&self, now_ms: EpochMillis, policy: &ConfirmationPolicy) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > policy.session_ttl_ms()
    }

    /// Runs one round of the protocol. Rejections never consume a slot.
    pub fn add_confirmation(
        &mut self,
        sample: LocationSample,
        analysis: SecurityAnalysis,
        now_ms: EpochMillis,
        policy: &ConfirmationPolicy,
        salt: &str,
    ) -> Result<ConfirmationOutcome, ConfirmationRejection> {
        if self.state != SessionState::Collecting {
            return Err(ConfirmationRejection::SessionClosed(self.state));
        }
        if self.is_expired(now_ms, policy) {
            self.state = SessionState::Expired;
            return Err(ConfirmationRejection::SessionExpired);
        }

        sample.coordinate().validate()?;
        check_accuracy(sample.accuracy_m, policy)?;

        if let Some(previous) = self.confirmations.last() {
            let elapsed_ms = now_ms.saturating_sub(previous.recorded_at_ms);
            if elapsed_ms < policy.min_interval_ms() {
                let wait_ms = policy.min_interval_ms() - elapsed_ms;
                return Err(ConfirmationRejection::TooSoon {
                    wait_secs: wait_ms.div_ceil(1000),
                });
            }
            if elapsed_ms > policy.max_interval_ms() {
                self.state = SessionState::Expired;
                return Err(ConfirmationRejection::Stale {
                    elapsed_secs: elapsed_ms / 1000,
                });
            }
            let drift_m = haversine_m(sample.coordinate(), previous.sample.coordinate());
            if drift_m > policy.max_drift_m {
                return Err(ConfirmationRejection::Drift {
                    drift_m,
                    max_m: policy.max_drift_m,
                });
            }
        }

        if analysis.is_suspicious {
            return Err(ConfirmationRejection::Suspicious(analysis.describe_warnings()));
        }

        self.confirmations.push(Confirmation {
            sample,
            analysis,
            recorded_at_ms: now_ms,
        });

        let count = self.confirmations.len();
        if count < policy.required_confirmations {
            tracing::debug!(
                session_id = %self.id,
                key = %self.key,
                confirmation = count,
                required = policy.required_confirmations,
                "confirmation recorded"
            );
            return Ok(ConfirmationOutcome::Recorded {
                confirmation: count,
                remaining: policy.required_confirmations - count,
            });
        }

        let location = self.final_location(now_ms, salt);
        let summary = self.summary(now_ms);
        self.state = SessionState::Complete;
        tracing::info!(
            session_id = %self.id,
            key = %self.key,
            latitude = location.latitude,
            longitude = location.longitude,
            average_accuracy_m = location.average_accuracy_m,
            consistency_score = location.consistency_score,
            "reference location locked"
        );
        Ok(ConfirmationOutcome::Locked { location, summary })
    }

    fn final_location(&self, now_ms: EpochMillis, salt: &str) -> LockedLocation {
        let samples: Vec<&LocationSample> = self.confirmations.iter().map(|c| &c.sample).collect();
        let count = samples.len() as f64;

        let weights: Vec<f64> = samples.iter().map(|s| 1.0 / (s.accuracy_m + 1.0)).collect();
        let total_weight: f64 = weights.iter().sum();
        let latitude = samples
            .iter()
            .zip(&weights)
            .map(|(s, w)| s.latitude * w)
            .sum::<f64>()
            / total_weight;
        let longitude = samples
            .iter()
            .zip(&weights)
            .map(|(s, w)| s.longitude * w)
            .sum::<f64>()
            / total_weight;

        let average_accuracy = samples.iter().map(|s| s.accuracy_m).sum::<f64>() / count;

        let lat_std = (samples
            .iter()
            .map(|s| (s.latitude - latitude).powi(2))
            .sum::<f64>()
            / count)
            .sqrt();
        let lon_std = (samples
            .iter()
            .map(|s| (s.longitude - longitude).powi(2))
            .sum::<f64>()
            / count)
            .sqrt();
        let lat_std_m = lat_std * SPREAD_METERS_PER_DEGREE;
        let lon_std_m = lon_std * SPREAD_METERS_PER_DEGREE * latitude.to_radians().cos();
        let consistency = (100.0 - (lat_std_m + lon_std_m) * 10.0).max(0.0);

        let latitude = round_to(latitude, 8);
        let longitude = round_to(longitude, 8);
        let hash = integrity_hash(
            Coordinate::new(latitude, longitude),
            datetime_from_millis(now_ms),
            salt,
        );

        LockedLocation {
            latitude,
            longitude,
            average_accuracy_m: round_to(average_accuracy, 2),
            consistency_score: round_to(consistency, 1),
            confirmation_count: self.confirmations.len(),
            integrity_hash: hash,
            locked_at_ms: now_ms,
        }
    }

    fn summary(&self, now_ms: EpochMillis) -> SessionSummary {
        let accuracies: Vec<f64> = self.confirmations.iter().map(|c| c.sample.accuracy_m).collect();
        let count = accuracies.len().max(1) as f64;
        let scores: f64 = self
            .confirmations
            .iter()
            .map(|c| f64::from(c.analysis.score))
            .sum();

        SessionSummary {
            session_id: self.id,
            total_confirmations: self.confirmations.len(),
            duration_secs: now_ms.saturating_sub(self.created_at_ms) as f64 / 1000.0,
            best_accuracy_m: accuracies.iter().copied().fold(f64::INFINITY, f64::min),
            worst_accuracy_m: accuracies.iter().copied().fold(0.0, f64::max),
            average_accuracy_m: accuracies.iter().sum::<f64>() / count,
            average_security_score: scores / count,
            all_confirmations_reliable: self
                .confirmations
                .iter()
                .all(|c| c.analysis.reliability == Reliability::High),
        }
    }
}

fn check_accuracy(
    accuracy_m: f64,
    policy: &ConfirmationPolicy,
) -> Result<(), ConfirmationRejection> {
    if !(accuracy_m.is_finite() && accuracy_m >= 0.0) {
        return Err(ConfirmationRejection::InvalidAccuracy(accuracy_m));
    }
    if accuracy_m > policy.max_accuracy_m {
        return Err(ConfirmationRejection::AccuracyTooLow {
            accuracy_m,
            max_m: policy.max_accuracy_m,
        });
    }
    if accuracy_m < policy.min_plausible_accuracy_m {
        return Err(ConfirmationRejection::AccuracyImplausible(accuracy_m));
    }
    Ok(())
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
