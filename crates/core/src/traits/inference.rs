//! Text inference traits.

use async_trait::async_trait;

use crate::error::Result;

/// Backend that turns a prompt into a completion.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Backend name for logs and payloads.
    fn name(&self) -> &str;

    /// Generate a completion.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
