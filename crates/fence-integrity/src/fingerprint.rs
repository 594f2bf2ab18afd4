use chrono::{DateTime, SecondsFormat, Utc};
use fence_core::LocationSample;
use fence_geo::Coordinate;
use serde_json::json;
use sha2::{Digest, Sha256};

/// Deterministic digest of the effective content of a submission. Two
/// submissions of the same fix within the same minute hash identically.
pub fn fingerprint(sample: &LocationSample) -> String {
    let device = sample.device.as_ref();
    let text_field = |value: Option<&String>| value.cloned().unwrap_or_default();
    let minute: String = sample
        .captured_at
        .as_deref()
        .map(|ts| ts.chars().take(16).collect())
        .unwrap_or_default();

    // object keys serialize in sorted order
    let canonical = json!({
        "coordinates": format!("{:.6},{:.6}", sample.latitude, sample.longitude),
        "accuracy": sample.accuracy_m,
        "userAgent": text_field(device.and_then(|d| d.user_agent.as_ref())),
        "platform": text_field(device.and_then(|d| d.platform.as_ref())),
        "timezone": text_field(device.and_then(|d| d.timezone.as_ref())),
        "timestamp_rounded": minute,
    });
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn integrity_input(coordinate: Coordinate, timestamp: DateTime<Utc>, salt: &str) -> String {
    format!(
        "{:.8}:{:.8}:{}:{}",
        coordinate.latitude,
        coordinate.longitude,
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        salt
    )
}

/// One-way binding of a position and the time it was fixed.
pub fn integrity_hash(coordinate: Coordinate, timestamp: DateTime<Utc>, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(integrity_input(coordinate, timestamp, salt).as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_integrity(
    coordinate: Coordinate,
    timestamp: DateTime<Utc>,
    salt: &str,
    stored_hash: &str,
) -> bool {
    !stored_hash.is_empty() && integrity_hash(coordinate, timestamp, salt) == stored_hash
}
