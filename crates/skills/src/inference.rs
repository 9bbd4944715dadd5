//! AI inference capability and its backends.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use deskpilot_core::{
    config::InferenceConfig,
    traits::{CapabilityModule, InferenceBackend},
    types::{CapabilityOutput, ParamBag},
    Error, Result,
};

use crate::params::OpParams;

pub const MODULE_NAME: &str = "ai_inference";

const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

// =============================================================================
// Capability Module
// =============================================================================

/// Capability exposing text analysis over an inference backend.
pub struct AiInferenceModule {
    backend: Arc<dyn InferenceBackend>,
}

impl AiInferenceModule {
    /// Create a new inference module.
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }

    async fn run(&self, operation: &str, prompt: String) -> Result<CapabilityOutput> {
        tracing::debug!(backend = %self.backend.name(), operation = %operation, "Running inference");
        let response = self.backend.complete(&prompt).await?;
        Ok(CapabilityOutput::ok(format!("{} complete", operation))
            .with_field("response", response)
            .with_field("backend", self.backend.name()))
    }
}

fn with_context(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("{}\n\nContext: {}", prompt, context),
        None => prompt.to_string(),
    }
}

#[async_trait]
impl CapabilityModule for AiInferenceModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn description(&self) -> &str {
        "Analyzes, summarizes and explains text"
    }

    fn operations(&self) -> Vec<String> {
        vec!["analyze".into(), "summarize".into(), "extract_meaning".into()]
    }

    async fn invoke(&self, operation: &str, params: ParamBag) -> Result<CapabilityOutput> {
        let args = OpParams::new(MODULE_NAME, operation, &params);

        let prompt = match operation {
            "analyze" => with_context(args.required("prompt")?, args.optional("context")),
            "summarize" => format!(
                "Summarize the following.\n{}",
                with_context(args.required("prompt")?, args.optional("context"))
            ),
            "extract_meaning" => format!(
                "Explain what this message means: {}",
                args.required("message")?
            ),
            other => return Err(Error::operation_not_found(MODULE_NAME, other)),
        };

        self.run(operation, prompt).await
    }
}

// =============================================================================
// Offline Backend
// =============================================================================

/// Deterministic backend used when no model endpoint is configured.
pub struct OfflineBackend;

impl OfflineBackend {
    const MAX_WORDS: usize = 40;
}

#[async_trait]
impl InferenceBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let words: Vec<&str> = prompt.split_whitespace().collect();
        let mut condensed = words
            .iter()
            .take(Self::MAX_WORDS)
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if words.len() > Self::MAX_WORDS {
            condensed.push_str(" ...");
        }
        Ok(format!("[offline] {}", condensed))
    }
}

// =============================================================================
// OpenAI-compatible Backend
// =============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Backend calling a `/chat/completions` endpoint.
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<Secret<String>>,
}

impl OpenAiBackend {
    /// Create a new backend.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<Secret<String>>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        })
    }

    fn failure(message: String) -> Error {
        Error::module(MODULE_NAME, message)
    }
}

#[async_trait]
impl InferenceBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::failure(format!("Inference request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Self::failure(format!(
                "Inference endpoint returned {}: {}",
                status, detail
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Self::failure(format!("Malformed inference response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Self::failure("Inference response had no choices".to_string()))
    }
}

/// Build the backend selected by `inference.provider`.
pub fn build_backend(config: &InferenceConfig) -> Result<Arc<dyn InferenceBackend>> {
    match config.provider.as_str() {
        "offline" => Ok(Arc::new(OfflineBackend)),
        "openai" => {
            let endpoint = config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string());
            tracing::info!(endpoint = %endpoint, model = %config.model, "Using OpenAI-compatible inference");
            Ok(Arc::new(OpenAiBackend::new(
                endpoint,
                config.model.clone(),
                config.api_key.clone(),
                Duration::from_millis(config.timeout_ms),
            )?))
        }
        other => Err(Error::Config(format!("Unknown inference provider '{}'", other))),
    }
}
