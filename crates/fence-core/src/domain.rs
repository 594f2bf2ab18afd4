use fence_geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Device and browser details reported alongside a position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Anything else the client sent. Never scored or hashed.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single client-submitted position fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    #[serde(default)]
    pub altitude_m: Option<f64>,
    #[serde(default)]
    pub speed_mps: Option<f64>,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    /// Client capture time as sent. Parsed lazily so malformed values can be
    /// scored instead of rejected at the boundary.
    #[serde(default)]
    pub captured_at: Option<String>,
    #[serde(default)]
    pub device: Option<DeviceMetadata>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            altitude_m: None,
            speed_mps: None,
            heading_deg: None,
            captured_at: None,
            device: None,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn with_captured_at(mut self, value: impl Into<String>) -> Self {
        self.captured_at = Some(value.into());
        self
    }

    pub fn with_altitude(mut self, value: f64) -> Self {
        self.altitude_m = Some(value);
        self
    }

    pub fn with_speed(mut self, value: f64) -> Self {
        self.speed_mps = Some(value);
        self
    }

    pub fn with_device(mut self, device: DeviceMetadata) -> Self {
        self.device = Some(device);
        self
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.device.as_ref().and_then(|d| d.user_agent.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_device_fields_land_in_extra() {
        let json = r#"{"latitude":40.7129,"longitude":-74.006,"accuracy_m":8.0,
            "device":{"user_agent":"ua","platform":"linux","battery":0.4}}"#;
        let sample: LocationSample = serde_json::from_str(json).unwrap();
        let device = sample.device.unwrap();
        assert_eq!(device.user_agent.as_deref(), Some("ua"));
        assert_eq!(device.extra.get("battery"), Some(&serde_json::json!(0.4)));
        assert!(sample.altitude_m.is_none());
        assert!(sample.captured_at.is_none());
    }
}
