//! Situational context traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ContextSnapshot;

/// Supplies the current on-screen situation.
///
/// May fail; callers degrade to text-only classification.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Capture a fresh snapshot.
    async fn snapshot(&self) -> Result<ContextSnapshot>;
}
