use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use deskpilot_controller::PipelineBuilder;
use deskpilot_core::config::ExecutorConfig;
use deskpilot_core::mocks::MockCommandHandler;
use deskpilot_core::traits::{CapabilityStatus, CommandHandler};
use deskpilot_core::types::{CandidateElement, ContextSnapshot};
use deskpilot_gateway::{GatewayConfig, GatewayServer};
use deskpilot_skills::{BuiltinModules, DefaultCapabilityRegistry, OfflineBackend};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(handler: Arc<dyn CommandHandler>) -> Router {
    GatewayServer::new(GatewayConfig::default(), handler).build_router()
}

async fn pipeline_app() -> Router {
    let registry = Arc::new(DefaultCapabilityRegistry::new());
    let modules = BuiltinModules::new(Default::default(), Arc::new(OfflineBackend));
    modules.register_all(registry.as_ref()).await.unwrap();

    let pipeline = PipelineBuilder::new()
        .with_registry(registry)
        .with_executor_config(ExecutorConfig::immediate())
        .build()
        .unwrap();
    app(Arc::new(pipeline))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("Content-Type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, json) = send(app(Arc::new(MockCommandHandler::new())), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_command_endpoint_shape() {
    let handler = Arc::new(MockCommandHandler::new());
    let (status, json) = send(
        app(handler.clone()),
        "POST",
        "/v1/commands",
        Some(json!({"command": "summarize my day"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["intentType"], "general");
    assert_eq!(json["results"][0]["verified"], true);
    assert!(json["results"][0]["description"].is_string());
    assert_eq!(json["runId"], "mock-run-1");
    assert_eq!(handler.requests()[0].command, "summarize my day");
}

#[tokio::test]
async fn test_command_through_pipeline() {
    let context = ContextSnapshot::new("Desktop").with_candidate(CandidateElement::actor("Alice"));
    let (status, json) = send(
        pipeline_app().await,
        "POST",
        "/v1/commands",
        Some(json!({
            "command": "open the messaging app and go to Alice's conversation",
            "context": context,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intentType"], "complex_workflow");
    assert_eq!(json["successCount"], 2);
    assert_eq!(json["success"], true);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_command_is_bad_request() {
    let (status, json) = send(pipeline_app().await, "POST", "/v1/commands", Some(json!({"command": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_intent_preview() {
    let (status, json) = send(
        pipeline_app().await,
        "POST",
        "/v1/intent",
        Some(json!({"command": "turn on the Talend API extension"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intent"]["type"], "activate_extension");
    assert_eq!(json["plan"]["steps"][1]["params"]["extension"], "Talend API");
}

#[tokio::test]
async fn test_validate_plan() {
    let app = pipeline_app().await;

    let valid = json!({"steps": [{"ordinal": 1, "module": "screen", "operation": "capture"}]});
    let (status, json) = send(app.clone(), "POST", "/v1/plans/validate", Some(valid)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert!(json.get("error").is_none());

    let invalid = json!({"steps": [{"ordinal": 1, "module": "screen"}]});
    let (status, json) = send(app, "POST", "/v1/plans/validate", Some(invalid)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], false);
    assert_eq!(json["error"]["code"], "INVALID_STEP");
}

#[tokio::test]
async fn test_execute_plan() {
    let app = pipeline_app().await;

    let plan = json!({
        "workflow": "open_mailbox",
        "steps": [
            {"ordinal": 1, "module": "browser", "operation": "open_url", "params": {"url": "https://mail.google.com"}},
            {"ordinal": 2, "module": "fax", "operation": "send"}
        ]
    });
    let (status, json) = send(app.clone(), "POST", "/v1/plans/execute", Some(plan)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intentType"], "open_mailbox");
    assert_eq!(json["successCount"], 1);
    assert_eq!(json["results"][1]["success"], false);

    let malformed = json!({"steps": [{"ordinal": 2, "module": "browser", "operation": "open_url"}]});
    let (status, json) = send(app, "POST", "/v1/plans/execute", Some(malformed)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "INVALID_STEP");
}

#[tokio::test]
async fn test_capabilities_endpoint() {
    let handler = MockCommandHandler::new().with_capabilities(vec![CapabilityStatus {
        name: "browser".into(),
        available: false,
        reason: Some("disabled by configuration".into()),
        operations: vec!["open_url".into(), "list_extensions".into()],
    }]);

    let (status, json) = send(app(Arc::new(handler)), "GET", "/v1/capabilities", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["capabilities"][0]["available"], false);
    assert_eq!(json["operations"], json!(["browser.open_url", "browser.list_extensions"]));
}

#[tokio::test]
async fn test_runs_and_cancel() {
    let handler = Arc::new(MockCommandHandler::new().with_active_run("run-7"));
    let app = app(handler.clone());

    let (status, json) = send(app.clone(), "GET", "/v1/runs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["runs"], json!(["run-7"]));

    let (status, json) = send(app.clone(), "POST", "/v1/runs/run-7/cancel", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["runId"], "run-7");

    let (status, json) = send(app, "POST", "/v1/runs/run-7/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "RUN_NOT_FOUND");
}
