//! Prometheus metrics for botanist-service.
//!
//! HTTP request metrics come from the shared middleware; this module adds
//! upstream provider call counts and latency.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record one upstream call.
pub fn record_provider_call(provider: &'static str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "error" };

    counter!(
        "botanist_provider_requests_total",
        "provider" => provider,
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "botanist_provider_latency_seconds",
        "provider" => provider
    )
    .record(elapsed.as_secs_f64());
}
