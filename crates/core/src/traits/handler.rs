//! Command handling traits.

use async_trait::async_trait;

use super::capability::CapabilityStatus;
use crate::error::Result;
use crate::types::{CommandOutcome, CommandRequest, Plan, PlanPreview};

/// Entry point transports call into.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Classify, decompose and execute a command.
    async fn handle(&self, request: CommandRequest) -> Result<CommandOutcome>;

    /// Classify and decompose without executing.
    async fn preview(&self, request: CommandRequest) -> Result<PlanPreview>;

    /// Execute a caller-supplied plan.
    async fn execute_plan(&self, plan: Plan) -> Result<CommandOutcome>;

    /// Cancel an in-flight run between steps.
    fn cancel(&self, run_id: &str) -> Result<()>;

    /// Identifiers of in-flight runs.
    fn active_runs(&self) -> Vec<String>;

    /// Registry status.
    fn capabilities(&self) -> Vec<CapabilityStatus>;
}
