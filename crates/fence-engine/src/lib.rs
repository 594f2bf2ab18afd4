//! Check-in evaluation and reference-location confirmation.
//!
//! [`GeofenceEngine`] owns the admission policy, the integrity thresholds and
//! the confirmation session store. Everything it returns is data; nothing it
//! does blocks on I/O.

pub mod api;
pub mod settings;

pub use api::{
    CheckInRequest, CheckInResponse, ConfirmationRequest, ConfirmationResponse, FinalLocation,
    LocationMetadata, LocationPayload,
};
pub use settings::{ConversionReport, GeofenceConfig, ResolvedFence};

use fence_config::EngineConfig;
use fence_core::{now_epoch_millis, EpochMillis, LocationSample, SessionKey};
use fence_integrity::{analyze_metadata, assess, IntegrityReport};
use fence_observability::{record_admission, record_confirmation, record_degradation};
use fence_policy::{AdmissionDecision, AdmissionPolicy, ReasonCode, StandardAdmissionPolicy};
use fence_session::{ConfirmationOutcome, ConfirmationRejection, SessionProgress, SessionStore};

pub struct GeofenceEngine {
    config: EngineConfig,
    policy: StandardAdmissionPolicy,
    sessions: SessionStore,
}

impl GeofenceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            policy: StandardAdmissionPolicy::new(config.admission),
            sessions: SessionStore::new(config.confirmation),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decides whether `sample` is inside the configured geofence. Input
    /// problems and unreadable settings come back as rejected decisions.
    pub fn evaluate_check_in(
        &self,
        config: &GeofenceConfig,
        sample: &LocationSample,
    ) -> AdmissionDecision {
        let decision = match config.resolve(&self.config.admission) {
            Ok(resolved) => {
                let mut decision = self.policy.admit(&resolved.fence, sample);
                if let Some(degradation) = resolved.degradation {
                    decision.degradations.insert(0, degradation);
                }
                decision
            }
            Err(err) => {
                tracing::warn!(
                    method = %config.geofence_type,
                    error = %err,
                    "geofence settings unusable"
                );
                AdmissionDecision::rejected(
                    config.geofence_type,
                    ReasonCode::InvalidBoundary,
                    err.message,
                )
            }
        };

        for degradation in &decision.degradations {
            record_degradation(degradation.as_str());
        }
        record_admission(
            decision.method.as_str(),
            decision.reason.as_str(),
            decision.inside,
        );
        decision
    }

    pub fn assess_integrity(&self, sample: &LocationSample) -> IntegrityReport {
        self.assess_integrity_at(sample, now_epoch_millis())
    }

    pub fn assess_integrity_at(
        &self,
        sample: &LocationSample,
        now_ms: EpochMillis,
    ) -> IntegrityReport {
        assess(sample, now_ms, &self.config.integrity)
    }

    pub fn advance_confirmation(
        &self,
        key: SessionKey,
        sample: LocationSample,
    ) -> Result<ConfirmationOutcome, ConfirmationRejection> {
        self.advance_confirmation_at(key, sample, now_epoch_millis())
    }

    /// Scores the sample and feeds it to the session for `key`.
    pub fn advance_confirmation_at(
        &self,
        key: SessionKey,
        sample: LocationSample,
        now_ms: EpochMillis,
    ) -> Result<ConfirmationOutcome, ConfirmationRejection> {
        let analysis = analyze_metadata(&sample, now_ms, &self.config.integrity);
        let result = self
            .sessions
            .advance(key, sample, analysis, now_ms, &self.config.integrity_salt);

        let outcome = match &result {
            Ok(ConfirmationOutcome::Recorded { .. }) => "recorded",
            Ok(ConfirmationOutcome::Locked { .. }) => "locked",
            Err(rejection) => rejection.reason_code(),
        };
        record_confirmation(outcome);
        result
    }

    pub fn reset_confirmation(&self, key: SessionKey) -> bool {
        self.sessions.reset(key)
    }

    pub fn confirmation_progress(&self, key: SessionKey) -> Option<SessionProgress> {
        self.sessions.progress(key, now_epoch_millis())
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions_at(now_epoch_millis())
    }

    pub fn active_sessions_at(&self, now_ms: EpochMillis) -> usize {
        self.sessions.active_sessions(now_ms)
    }

    /// Verifies a stored reference against this engine's salt.
    pub fn verify_reference(&self, config: &GeofenceConfig) -> bool {
        config.verify_reference_integrity(&self.config.integrity_salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fence_geo::{Coordinate, Degradation};
    use fence_policy::GeofenceMethod;

    fn engine() -> GeofenceEngine {
        GeofenceEngine::new(EngineConfig::with_salt("fence-test", "unit-salt"))
    }

    #[test]
    fn broken_record_is_evaluated_as_circle() {
        let mut config = GeofenceConfig::circular(Coordinate::new(40.7129, -74.006), 50.0);
        config.geofence_type = GeofenceMethod::Rectangular;
        config.boundary_record = Some("not json".to_string());

        let sample = LocationSample::new(40.7130, -74.006, 5.0);
        let decision = engine().evaluate_check_in(&config, &sample);
        assert!(decision.inside);
        assert_eq!(decision.method, GeofenceMethod::Circular);
        assert_eq!(decision.reason, ReasonCode::InsideRadius);
        assert_eq!(decision.degradations, vec![Degradation::CircularFallback]);
    }

    #[test]
    fn settings_without_any_geometry_reject() {
        let mut config = GeofenceConfig::circular(Coordinate::new(40.7129, -74.006), 50.0);
        config.radius_m = None;
        let sample = LocationSample::new(40.7130, -74.006, 5.0);
        let decision = engine().evaluate_check_in(&config, &sample);
        assert!(!decision.inside);
        assert_eq!(decision.reason, ReasonCode::InvalidBoundary);
        assert!(decision.detail.unwrap().contains("circular"));
    }

    #[test]
    fn reset_and_count_sessions() {
        let engine = engine();
        let key = SessionKey::new(fence_core::BoundaryOwnerId(1), fence_core::SubjectId(2));
        let now = now_epoch_millis();
        let sample = LocationSample::new(40.7129, -74.006, 5.0).with_altitude(12.0);
        engine.advance_confirmation_at(key, sample, now).unwrap();
        assert_eq!(engine.active_sessions_at(now), 1);
        assert!(engine.confirmation_progress(key).is_some());
        assert!(engine.reset_confirmation(key));
        assert_eq!(engine.active_sessions_at(now), 0);
    }
}
