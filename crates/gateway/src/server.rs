//! Axum-based HTTP server for the gateway.

use axum::{
    extract::{Json, MatchedPath, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use deskpilot_core::{
    config::ServerConfig,
    traits::{CapabilityStatus, CommandHandler},
    types::{CommandRequest, CommandResponse, Plan, PlanPreview, PlanRequest},
    Error, Result,
};
use deskpilot_governance::track_request;

use crate::ws::ws_handler;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Enable CORS.
    pub enable_cors: bool,
    /// Enable request tracing.
    pub enable_tracing: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for GatewayConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            enable_cors: config.enable_cors,
            enable_tracing: true,
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Command handler every route delegates to.
    pub handler: Arc<dyn CommandHandler>,
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            config,
            state: Arc::new(AppState { handler }),
            metrics_handle: None,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/v1/capabilities", get(capabilities_handler))
            .route("/v1/commands", post(command_handler))
            .route("/v1/intent", post(intent_handler))
            .route("/v1/plans/validate", post(validate_plan_handler))
            .route("/v1/plans/execute", post(execute_plan_handler))
            .route("/v1/runs", get(runs_handler))
            .route("/v1/runs/:run_id/cancel", post(cancel_handler))
            .route("/v1/ws", get(ws_handler))
            .route_layer(middleware::from_fn(track_http))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        if self.config.enable_cors {
            router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
        }

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::gateway(format!("Failed to bind: {}", e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::gateway(format!("Server error: {}", e)))?;

        Ok(())
    }
}

async fn track_http(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;
    track_request(&method, &path, response.status().as_u16(), started.elapsed().as_secs_f64());
    response
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Registry status plus the flat `module.operation` list.
#[derive(Debug, Serialize, Deserialize)]
pub struct CapabilitiesResponse {
    pub capabilities: Vec<CapabilityStatus>,
    pub operations: Vec<String>,
}

/// Result of a plan validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// In-flight runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunsResponse {
    pub runs: Vec<String>,
}

/// Acknowledgement of a cancellation request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub run_id: String,
    pub cancelling: bool,
}

/// Core error rendered as an HTTP response.
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidStep { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::RunNotFound(_) | Error::CapabilityNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::CapabilityBusy(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "Request rejected");
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn capabilities_handler(State(state): State<Arc<AppState>>) -> Json<CapabilitiesResponse> {
    let capabilities = state.handler.capabilities();
    let operations = capabilities
        .iter()
        .flat_map(|status| {
            status
                .operations
                .iter()
                .map(move |op| format!("{}.{}", status.name, op))
        })
        .collect();

    Json(CapabilitiesResponse {
        capabilities,
        operations,
    })
}

/// Classify, decompose and execute a command.
async fn command_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> ApiResult<CommandResponse> {
    tracing::info!(command_len = request.command.len(), "Processing command");
    let outcome = state.handler.handle(request).await?;
    Ok(Json(CommandResponse::from(&outcome)))
}

/// Classify and decompose without executing.
async fn intent_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> ApiResult<PlanPreview> {
    Ok(Json(state.handler.preview(request).await?))
}

async fn validate_plan_handler(Json(request): Json<PlanRequest>) -> Json<ValidationResponse> {
    let plan = Plan::from(request);
    Json(match plan.validate() {
        Ok(()) => ValidationResponse {
            valid: true,
            error: None,
        },
        Err(e) => ValidationResponse {
            valid: false,
            error: Some(ErrorResponse::from(&e)),
        },
    })
}

/// Execute a caller-supplied plan.
async fn execute_plan_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<CommandResponse> {
    let outcome = state.handler.execute_plan(Plan::from(request)).await?;
    Ok(Json(CommandResponse::from(&outcome)))
}

async fn runs_handler(State(state): State<Arc<AppState>>) -> Json<RunsResponse> {
    Json(RunsResponse {
        runs: state.handler.active_runs(),
    })
}

async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> std::result::Result<(StatusCode, Json<CancelResponse>), ApiError> {
    state.handler.cancel(&run_id)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            run_id,
            cancelling: true,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::invalid_step(2, "missing module"), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::RunNotFound("r".into()), StatusCode::NOT_FOUND),
            (Error::invalid_request("empty"), StatusCode::BAD_REQUEST),
            (Error::CapabilityBusy("automation".into()), StatusCode::CONFLICT),
            (Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError(error).status(), status);
        }
    }
}
