//! Request and response shapes exchanged with the web layer.

use fence_core::{BoundaryOwnerId, DeviceMetadata, LocationSample, SessionKey, SubjectId};
use fence_policy::{AdmissionDecision, GeofenceMethod, ReasonCode};
use fence_session::{ConfirmationOutcome, ConfirmationRejection, LockedLocation};
use serde::{Deserialize, Serialize};

/// Optional signals a browser reports next to the fix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMetadata {
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    #[serde(default)]
    pub metadata: Option<LocationMetadata>,
}

impl LocationPayload {
    pub fn to_sample(&self) -> LocationSample {
        let mut sample = LocationSample::new(self.latitude, self.longitude, self.accuracy);
        if let Some(metadata) = &self.metadata {
            sample.altitude_m = metadata.altitude;
            sample.speed_mps = metadata.speed;
            sample.heading_deg = metadata.heading;
            sample.captured_at = metadata.timestamp.clone();
            let has_device = metadata.user_agent.is_some()
                || metadata.platform.is_some()
                || metadata.timezone.is_some();
            if has_device {
                sample.device = Some(DeviceMetadata {
                    user_agent: metadata.user_agent.clone(),
                    platform: metadata.platform.clone(),
                    timezone: metadata.timezone.clone(),
                    ..DeviceMetadata::default()
                });
            }
        }
        sample
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub boundary_owner_id: BoundaryOwnerId,
    pub subject_id: SubjectId,
    #[serde(flatten)]
    pub location: LocationPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub inside: bool,
    pub method: GeofenceMethod,
    pub reason_code: ReasonCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_edge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_edge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    pub tolerance_applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub degraded: bool,
}

impl From<&AdmissionDecision> for CheckInResponse {
    fn from(value: &AdmissionDecision) -> Self {
        Self {
            inside: value.inside,
            method: value.method,
            reason_code: value.reason,
            distance_to_edge: value.distance_to_edge_m.map(round2),
            nearest_edge: value.nearest_edge.map(|edge| edge.to_string()),
            distance: value.distance_from_center_m.map(round2),
            radius: value.radius_m,
            tolerance_applied: value.tolerance_applied,
            guidance: value.guidance(),
            detail: value.detail.clone(),
            degraded: value.degraded(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub boundary_owner_id: BoundaryOwnerId,
    pub subject_id: SubjectId,
    #[serde(flatten)]
    pub location: LocationPayload,
}

impl ConfirmationRequest {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.boundary_owner_id, self.subject_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub average_accuracy: f64,
    pub consistency_score: f64,
    pub confirmation_count: usize,
    pub integrity_hash: String,
}

impl From<&LockedLocation> for FinalLocation {
    fn from(value: &LockedLocation) -> Self {
        Self {
            latitude: value.latitude,
            longitude: value.longitude,
            average_accuracy: value.average_accuracy_m,
            consistency_score: value.consistency_score,
            confirmation_count: value.confirmation_count,
            integrity_hash: value.integrity_hash.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResponse {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<usize>,
    #[serde(rename = "final", default, skip_serializing_if = "Option::is_none")]
    pub final_location: Option<FinalLocation>,
}

impl ConfirmationResponse {
    pub fn from_result(result: &Result<ConfirmationOutcome, ConfirmationRejection>) -> Self {
        match result {
            Ok(ConfirmationOutcome::Recorded {
                confirmation,
                remaining,
            }) => Self {
                accepted: true,
                reason: None,
                reason_code: None,
                confirmation: Some(*confirmation),
                remaining: Some(*remaining),
                final_location: None,
            },
            Ok(ConfirmationOutcome::Locked { location, .. }) => Self {
                accepted: true,
                reason: None,
                reason_code: None,
                confirmation: Some(location.confirmation_count),
                remaining: Some(0),
                final_location: Some(FinalLocation::from(location)),
            },
            Err(rejection) => Self {
                accepted: false,
                reason: Some(rejection.to_string()),
                reason_code: Some(rejection.reason_code().to_string()),
                confirmation: None,
                remaining: None,
                final_location: None,
            },
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn check_in_request_reads_browser_payload() {
        let request: CheckInRequest = serde_json::from_value(json!({
            "boundaryOwnerId": 12,
            "subjectId": 345,
            "latitude": 40.7129,
            "longitude": -74.006,
            "accuracy": 8.5,
            "metadata": {
                "altitude": 10.0,
                "timestamp": "2024-03-01T10:15:30Z",
                "userAgent": "Mozilla/5.0",
                "timezone": "America/New_York"
            }
        }))
        .unwrap();
        assert_eq!(request.boundary_owner_id, BoundaryOwnerId(12));

        let sample = request.location.to_sample();
        assert_eq!(sample.accuracy_m, 8.5);
        assert_eq!(sample.altitude_m, Some(10.0));
        assert_eq!(sample.captured_at.as_deref(), Some("2024-03-01T10:15:30Z"));
        assert_eq!(sample.user_agent(), Some("Mozilla/5.0"));
        assert_eq!(sample.speed_mps, None);
    }

    #[test]
    fn bare_payload_has_no_device() {
        let payload: LocationPayload = serde_json::from_value(json!({
            "latitude": 40.7129, "longitude": -74.006, "accuracy": 5
        }))
        .unwrap();
        let sample = payload.to_sample();
        assert!(sample.device.is_none());
        assert!(sample.captured_at.is_none());
    }

    #[test]
    fn rejection_response_carries_reason() {
        let result = Err(ConfirmationRejection::TooSoon { wait_secs: 12 });
        let value = serde_json::to_value(ConfirmationResponse::from_result(&result)).unwrap();
        assert_eq!(value["accepted"], false);
        assert_eq!(value["reasonCode"], "too_soon");
        assert!(value["reason"].as_str().unwrap().contains("12 more seconds"));
        assert!(value.get("final").is_none());
    }

    #[test]
    fn final_round_response_uses_final_key() {
        let location = LockedLocation {
            latitude: 40.7129,
            longitude: -74.006,
            average_accuracy_m: 6.33,
            consistency_score: 98.2,
            confirmation_count: 3,
            integrity_hash: "ab".repeat(32),
            locked_at_ms: 1_709_288_130_000,
        };
        let summary = fence_session::SessionSummary {
            session_id: fence_core::SessionId::new(),
            total_confirmations: 3,
            duration_secs: 75.0,
            best_accuracy_m: 4.0,
            worst_accuracy_m: 9.0,
            average_accuracy_m: 6.33,
            average_security_score: 90.0,
            all_confirmations_reliable: true,
        };
        let result = Ok(ConfirmationOutcome::Locked { location, summary });
        let value = serde_json::to_value(ConfirmationResponse::from_result(&result)).unwrap();
        assert_eq!(value["accepted"], true);
        assert_eq!(value["final"]["averageAccuracy"], 6.33);
        assert_eq!(value["final"]["confirmationCount"], 3);
        assert_eq!(value["final"]["consistencyScore"], 98.2);
    }
}
