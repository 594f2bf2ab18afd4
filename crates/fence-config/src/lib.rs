use serde::{Deserialize, Serialize};
use std::{env, fmt};

pub const DEFAULT_TOLERANCE_M: f64 = 2.0;
pub const DEFAULT_GPS_ACCURACY_THRESHOLD_M: f64 = 20.0;
/// Outside points may only use the tolerance margin at or below this accuracy.
pub const GOOD_GPS_ACCURACY_M: f64 = 10.0;

pub const MODERATE_ACCURACY_M: f64 = 20.0;
pub const POOR_ACCURACY_M: f64 = 50.0;
pub const MOVING_SPEED_MPS: f64 = 2.0;
pub const STALE_AFTER_SECS: u64 = 300;
pub const MIN_PLAUSIBLE_ACCURACY_M: f64 = 1.0;
pub const MAX_PLAUSIBLE_SPEED_MPS: f64 = 50.0;
pub const SPOOF_PRECISION_DIGITS: usize = 6;
pub const OLD_TIMESTAMP_SECS: u64 = 3600;
pub const MAX_REPORTED_ACCURACY_M: f64 = 1000.0;

pub const REQUIRED_CONFIRMATIONS: usize = 3;
pub const MIN_CONFIRMATION_INTERVAL_SECS: u64 = 30;
pub const MAX_CONFIRMATION_INTERVAL_SECS: u64 = 300;
pub const MAX_CONFIRMATION_DRIFT_M: f64 = 5.0;
pub const MAX_CONFIRMATION_ACCURACY_M: f64 = 15.0;
pub const SESSION_TTL_SECS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Local,
    Dev,
    Test,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_env(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "local" => Self::Local,
            "dev" | "development" => Self::Dev,
            "test" | "testing" => Self::Test,
            "staging" => Self::Staging,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub environment: Environment,
    pub log_level: String,
    pub metrics_addr: Option<String>,
}

impl ServiceConfig {
    pub fn from_env(default_service_name: &str) -> Self {
        Self::from_lookup(default_service_name, process_env)
    }

    pub fn from_lookup<F>(default_service_name: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            service_name: env_var(
                &lookup,
                "FENCE_SERVICE_NAME",
                default_service_name.to_string(),
            ),
            environment: Environment::from_env(&env_var(&lookup, "FENCE_ENV", "local".to_string())),
            log_level: env_var(&lookup, "FENCE_LOG_LEVEL", "info".to_string()),
            metrics_addr: lookup("FENCE_METRICS_ADDR").filter(|value| !value.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdmissionPolicyConfig {
    pub default_tolerance_m: f64,
    pub default_gps_accuracy_threshold_m: f64,
    pub good_gps_accuracy_m: f64,
}

impl Default for AdmissionPolicyConfig {
    fn default() -> Self {
        Self {
            default_tolerance_m: DEFAULT_TOLERANCE_M,
            default_gps_accuracy_threshold_m: DEFAULT_GPS_ACCURACY_THRESHOLD_M,
            good_gps_accuracy_m: GOOD_GPS_ACCURACY_M,
        }
    }
}

impl AdmissionPolicyConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            default_tolerance_m: env_var_f64(
                &lookup,
                "FENCE_TOLERANCE_M",
                defaults.default_tolerance_m,
            ),
            default_gps_accuracy_threshold_m: env_var_f64(
                &lookup,
                "FENCE_GPS_ACCURACY_THRESHOLD_M",
                defaults.default_gps_accuracy_threshold_m,
            ),
            good_gps_accuracy_m: env_var_f64(
                &lookup,
                "FENCE_GOOD_GPS_ACCURACY_M",
                defaults.good_gps_accuracy_m,
            ),
        }
    }
}

/// Thresholds used when scoring client-supplied location metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrityPolicy {
    pub moderate_accuracy_m: f64,
    pub poor_accuracy_m: f64,
    pub moving_speed_mps: f64,
    pub stale_after_secs: u64,
    pub min_plausible_accuracy_m: f64,
    pub max_plausible_speed_mps: f64,
    pub spoof_precision_digits: usize,
    pub old_timestamp_secs: u64,
    pub max_reported_accuracy_m: f64,
}

impl Default for IntegrityPolicy {
    fn default() -> Self {
        Self {
            moderate_accuracy_m: MODERATE_ACCURACY_M,
            poor_accuracy_m: POOR_ACCURACY_M,
            moving_speed_mps: MOVING_SPEED_MPS,
            stale_after_secs: STALE_AFTER_SECS,
            min_plausible_accuracy_m: MIN_PLAUSIBLE_ACCURACY_M,
            max_plausible_speed_mps: MAX_PLAUSIBLE_SPEED_MPS,
            spoof_precision_digits: SPOOF_PRECISION_DIGITS,
            old_timestamp_secs: OLD_TIMESTAMP_SECS,
            max_reported_accuracy_m: MAX_REPORTED_ACCURACY_M,
        }
    }
}

impl IntegrityPolicy {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            moderate_accuracy_m: env_var_f64(
                &lookup,
                "FENCE_MODERATE_ACCURACY_M",
                d.moderate_accuracy_m,
            ),
            poor_accuracy_m: env_var_f64(&lookup, "FENCE_POOR_ACCURACY_M", d.poor_accuracy_m),
            moving_speed_mps: env_var_f64(&lookup, "FENCE_MOVING_SPEED_MPS", d.moving_speed_mps),
            stale_after_secs: env_var_u64(&lookup, "FENCE_STALE_AFTER_SECS", d.stale_after_secs),
            min_plausible_accuracy_m: env_var_f64(
                &lookup,
                "FENCE_MIN_PLAUSIBLE_ACCURACY_M",
                d.min_plausible_accuracy_m,
            ),
            max_plausible_speed_mps: env_var_f64(
                &lookup,
                "FENCE_MAX_PLAUSIBLE_SPEED_MPS",
                d.max_plausible_speed_mps,
            ),
            spoof_precision_digits: env_var_u64(
                &lookup,
                "FENCE_SPOOF_PRECISION_DIGITS",
                d.spoof_precision_digits as u64,
            ) as usize,
            old_timestamp_secs: env_var_u64(
                &lookup,
                "FENCE_OLD_TIMESTAMP_SECS",
                d.old_timestamp_secs,
            ),
            max_reported_accuracy_m: env_var_f64(
                &lookup,
                "FENCE_MAX_REPORTED_ACCURACY_M",
                d.max_reported_accuracy_m,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationPolicy {
    pub required_confirmations: usize,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    pub max_drift_m: f64,
    pub max_accuracy_m: f64,
    pub min_plausible_accuracy_m: f64,
    pub session_ttl_secs: u64,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            required_confirmations: REQUIRED_CONFIRMATIONS,
            min_interval_secs: MIN_CONFIRMATION_INTERVAL_SECS,
            max_interval_secs: MAX_CONFIRMATION_INTERVAL_SECS,
            max_drift_m: MAX_CONFIRMATION_DRIFT_M,
            max_accuracy_m: MAX_CONFIRMATION_ACCURACY_M,
            min_plausible_accuracy_m: MIN_PLAUSIBLE_ACCURACY_M,
            session_ttl_secs: SESSION_TTL_SECS,
        }
    }
}

impl ConfirmationPolicy {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let required = env_var_u64(
            &lookup,
            "FENCE_REQUIRED_CONFIRMATIONS",
            d.required_confirmations as u64,
        );
        Self {
            required_confirmations: (required as usize).max(1),
            min_interval_secs: env_var_u64(
                &lookup,
                "FENCE_CONFIRMATION_MIN_INTERVAL_SECS",
                d.min_interval_secs,
            ),
            max_interval_secs: env_var_u64(
                &lookup,
                "FENCE_CONFIRMATION_MAX_INTERVAL_SECS",
                d.max_interval_secs,
            ),
            max_drift_m: env_var_f64(&lookup, "FENCE_CONFIRMATION_MAX_DRIFT_M", d.max_drift_m),
            max_accuracy_m: env_var_f64(
                &lookup,
                "FENCE_CONFIRMATION_MAX_ACCURACY_M",
                d.max_accuracy_m,
            ),
            min_plausible_accuracy_m: env_var_f64(
                &lookup,
                "FENCE_MIN_PLAUSIBLE_ACCURACY_M",
                d.min_plausible_accuracy_m,
            ),
            session_ttl_secs: env_var_u64(&lookup, "FENCE_SESSION_TTL_SECS", d.session_ttl_secs),
        }
    }

    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_secs.saturating_mul(1000)
    }

    pub fn max_interval_ms(&self) -> u64 {
        self.max_interval_secs.saturating_mul(1000)
    }

    pub fn session_ttl_ms(&self) -> u64 {
        self.session_ttl_secs.saturating_mul(1000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub service: ServiceConfig,
    pub admission: AdmissionPolicyConfig,
    pub integrity: IntegrityPolicy,
    pub confirmation: ConfirmationPolicy,
    #[serde(skip_serializing)]
    pub integrity_salt: String,
}

impl EngineConfig {
    pub fn from_env(default_service_name: &str) -> Self {
        Self::from_lookup(default_service_name, process_env)
    }

    pub fn from_lookup<F>(default_service_name: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let configured = lookup("FENCE_INTEGRITY_SALT").filter(|value| !value.is_empty());
        let integrity_salt = match configured {
            Some(salt) => salt,
            None => {
                tracing::warn!(
                    variable = "FENCE_INTEGRITY_SALT",
                    "integrity salt not set; hashes will only verify within this process"
                );
                generated_salt()
            }
        };

        Self {
            service: ServiceConfig::from_lookup(default_service_name, &lookup),
            admission: AdmissionPolicyConfig::from_lookup(&lookup),
            integrity: IntegrityPolicy::from_lookup(&lookup),
            confirmation: ConfirmationPolicy::from_lookup(&lookup),
            integrity_salt,
        }
    }

    /// Defaults everywhere with an explicit salt. Handy for embedding and tests.
    pub fn with_salt(service_name: &str, salt: impl Into<String>) -> Self {
        Self {
            service: ServiceConfig::from_lookup(service_name, |_| None),
            admission: AdmissionPolicyConfig::default(),
            integrity: IntegrityPolicy::default(),
            confirmation: ConfirmationPolicy::default(),
            integrity_salt: salt.into(),
        }
    }
}

pub fn generated_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_var<F>(lookup: &F, key: &str, default: String) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or(default)
}

fn env_var_f64<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(default)
}

fn env_var_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_named_constants() {
        let config =
            EngineConfig::from_lookup("fence", lookup_from(&[("FENCE_INTEGRITY_SALT", "s")]));
        assert_eq!(config.admission.default_tolerance_m, 2.0);
        assert_eq!(config.admission.default_gps_accuracy_threshold_m, 20.0);
        assert_eq!(config.admission.good_gps_accuracy_m, 10.0);
        assert_eq!(config.confirmation.required_confirmations, 3);
        assert_eq!(config.confirmation.min_interval_ms(), 30_000);
        assert_eq!(config.confirmation.max_interval_ms(), 300_000);
        assert_eq!(config.confirmation.session_ttl_ms(), 600_000);
        assert_eq!(config.integrity, IntegrityPolicy::default());
        assert_eq!(config.service.environment, Environment::Local);
        assert_eq!(config.integrity_salt, "s");
    }

    #[test]
    fn overrides_are_read_and_bad_values_ignored() {
        let config = EngineConfig::from_lookup(
            "fence",
            lookup_from(&[
                ("FENCE_ENV", "production"),
                ("FENCE_TOLERANCE_M", "3.5"),
                ("FENCE_GPS_ACCURACY_THRESHOLD_M", "not-a-number"),
                ("FENCE_CONFIRMATION_MAX_DRIFT_M", "-4"),
                ("FENCE_REQUIRED_CONFIRMATIONS", "0"),
                ("FENCE_METRICS_ADDR", "127.0.0.1:9100"),
            ]),
        );
        assert_eq!(config.service.environment, Environment::Prod);
        assert_eq!(config.admission.default_tolerance_m, 3.5);
        assert_eq!(config.admission.default_gps_accuracy_threshold_m, 20.0);
        assert_eq!(config.confirmation.max_drift_m, 5.0);
        assert_eq!(config.confirmation.required_confirmations, 1);
        assert_eq!(
            config.service.metrics_addr.as_deref(),
            Some("127.0.0.1:9100")
        );
    }

    #[test]
    fn missing_salt_generates_one() {
        let a = EngineConfig::from_lookup("fence", |_| None);
        let b = EngineConfig::from_lookup("fence", |_| None);
        assert_eq!(a.integrity_salt.len(), 32);
        assert_ne!(a.integrity_salt, b.integrity_salt);
    }
}
