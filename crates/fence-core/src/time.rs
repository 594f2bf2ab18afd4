use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

pub type EpochMillis = u64;

pub fn now_epoch_millis() -> EpochMillis {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as EpochMillis
}

/// Parses an RFC 3339 timestamp. A timestamp without an offset is taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

pub fn datetime_from_millis(value: EpochMillis) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(value as i64).unwrap_or_default()
}

/// Signed age of `timestamp` relative to `now_ms`, in milliseconds. Negative
/// for timestamps in the future.
pub fn age_ms(timestamp: DateTime<Utc>, now_ms: EpochMillis) -> i64 {
    (now_ms as i64).saturating_sub(timestamp.timestamp_millis())
}

/// `true` once `timestamp` is strictly more than `limit_secs` old.
pub fn older_than(timestamp: DateTime<Utc>, now_ms: EpochMillis, limit_secs: u64) -> bool {
    i128::from(age_ms(timestamp, now_ms)) > i128::from(limit_secs) * 1000
}
