//! Metrics implementation using Prometheus.

use deskpilot_core::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// How a command run ended, as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcomeLabel {
    Success,
    Failure,
    Cancelled,
    Rejected,
}

impl CommandOutcomeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }
}

/// Track one command or plan run.
pub fn track_command(workflow: &str, outcome: CommandOutcomeLabel, latency_sec: f64) {
    metrics::counter!(
        "deskpilot_commands_total",
        "workflow" => workflow.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    metrics::histogram!(
        "deskpilot_command_duration_seconds",
        "workflow" => workflow.to_string()
    )
    .record(latency_sec);
}

/// Track one executed step. `outcome` is one of `verified`, `unverified`,
/// `failed` or `panicked`.
pub fn track_step(module: &str, operation: &str, outcome: &'static str) {
    metrics::counter!(
        "deskpilot_steps_total",
        "module" => module.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Helper to track HTTP request metrics (latency, count).
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}
