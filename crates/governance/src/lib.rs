//! Observability for Deskpilot.
//!
//! This crate provides:
//! - Structured logging with optional OTLP span export
//! - Prometheus metrics for commands, steps and HTTP requests

pub mod metrics;
pub mod tracing_layer;

pub use metrics::{
    setup_metrics_recorder, track_command, track_request, track_step, CommandOutcomeLabel,
};
pub use tracing_layer::configure_tracing;
