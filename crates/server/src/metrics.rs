//! Prometheus metrics
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`init_metrics`] installs the Prometheus recorder.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use crate::state::AppState;

/// Install the global Prometheus recorder.
///
/// Returns `None` (and logs) if a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// Record one processed step
pub fn record_step(mode: &'static str, outcome: &'static str, latency: Duration) {
    metrics::counter!("form_agent_steps_total", "mode" => mode, "outcome" => outcome).increment(1);
    metrics::histogram!("form_agent_step_latency_ms", "mode" => mode)
        .record(latency.as_secs_f64() * 1000.0);
}

/// Record a failed request
pub fn record_error(kind: &'static str) {
    metrics::counter!("form_agent_errors_total", "kind" => kind).increment(1);
}

pub fn record_active_sessions(count: usize) {
    metrics::gauge!("form_agent_active_sessions").set(count as f64);
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "metrics disabled\n".to_string(),
        ),
    }
}
