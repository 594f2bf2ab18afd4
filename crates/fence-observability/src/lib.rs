use fence_config::ServiceConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

pub const ADMISSIONS_TOTAL: &str = "fence_admissions_total";
pub const DEGRADATIONS_TOTAL: &str = "fence_degradations_total";
pub const CONFIRMATIONS_TOTAL: &str = "fence_confirmations_total";

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
    pub metrics_addr: Option<String>,
}

impl From<&ServiceConfig> for ObservabilityConfig {
    fn from(value: &ServiceConfig) -> Self {
        Self {
            service_name: value.service_name.clone(),
            environment: value.environment.to_string(),
            log_level: value.log_level.clone(),
            metrics_addr: value.metrics_addr.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObservabilityHandle {
    pub service_name: String,
    pub metrics_enabled: bool,
}

/// Installs the global subscriber and, when an address is configured, the
/// Prometheus listener. Safe to call more than once; later calls keep the
/// first subscriber.
pub fn init(config: &ObservabilityConfig) -> ObservabilityHandle {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);

    let metrics_enabled = init_metrics(config);

    ObservabilityHandle {
        service_name: config.service_name.clone(),
        metrics_enabled,
    }
}

pub fn log_startup(handle: &ObservabilityHandle, environment: &str) {
    tracing::info!(
        service = %handle.service_name,
        environment = %environment,
        metrics_enabled = handle.metrics_enabled,
        "geofence engine starting"
    );
}

pub fn record_admission(method: &str, reason: &str, accepted: bool) {
    metrics::counter!(
        ADMISSIONS_TOTAL,
        "method" => method.to_string(),
        "reason" => reason.to_string(),
        "accepted" => accepted.to_string()
    )
    .increment(1);
}

pub fn record_degradation(kind: &str) {
    metrics::counter!(DEGRADATIONS_TOTAL, "kind" => kind.to_string()).increment(1);
}

/// `outcome` is `recorded`, `locked` or a rejection reason code.
pub fn record_confirmation(outcome: &str) {
    metrics::counter!(CONFIRMATIONS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

fn init_metrics(config: &ObservabilityConfig) -> bool {
    let Some(addr) = config.metrics_addr.as_ref() else {
        return false;
    };
    let addr: SocketAddr = match addr.parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(
                service = %config.service_name,
                error = %err,
                "Invalid FENCE_METRICS_ADDR value"
            );
            return false;
        }
    };

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", config.service_name.clone())
        .add_global_label("environment", config.environment.clone());

    match builder.install() {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                service = %config.service_name,
                error = %err,
                "Failed to initialize Prometheus exporter"
            );
            false
        }
    }
}
