use serde::{Deserialize, Serialize};

use super::context::ContextSnapshot;
use super::intent::{Intent, WorkflowTag};
use super::outcome::{ExecutionReport, StepResult};
use super::plan::{Plan, Step};

// =============================================================================
// Request / Response Boundary
// =============================================================================

/// A command submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Free-text command.
    pub command: String,
    /// Context captured by the client (e.g. a browser extension).
    #[serde(default)]
    pub context: Option<ContextSnapshot>,
}

impl CommandRequest {
    /// Create a request without client context.
    pub fn text(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            context: None,
        }
    }

    /// Attach client-captured context.
    pub fn with_context(mut self, context: ContextSnapshot) -> Self {
        self.context = Some(context);
        self
    }
}

/// A caller-supplied plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Workflow label for reporting.
    #[serde(default = "default_plan_workflow")]
    pub workflow: WorkflowTag,
    /// Steps to run.
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_plan_workflow() -> WorkflowTag {
    WorkflowTag::General
}

impl From<PlanRequest> for Plan {
    fn from(request: PlanRequest) -> Self {
        Plan::new(request.workflow, request.steps)
    }
}

/// Result of running a command or plan through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    /// Identifier the run was tracked under.
    pub run_id: String,
    /// Classified intent, absent for caller-supplied plans.
    pub intent: Option<Intent>,
    /// Execution report.
    pub report: ExecutionReport,
}

/// Classification and decomposition without execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPreview {
    pub intent: Intent,
    pub plan: Plan,
}

/// Per-step line of a command response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub ordinal: usize,
    pub description: String,
    pub success: bool,
    pub verified: bool,
    pub message: String,
}

impl From<&StepResult> for StepSummary {
    fn from(result: &StepResult) -> Self {
        Self {
            ordinal: result.step.ordinal,
            description: result.step.description.clone(),
            success: result.success,
            verified: result.verified,
            message: result.message.clone(),
        }
    }
}

/// Payload returned to clients for every executed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
    pub intent_type: WorkflowTag,
    pub results: Vec<StepSummary>,
    pub run_id: String,
    pub cancelled: bool,
    pub success_count: usize,
    pub total_steps: usize,
    #[serde(default)]
    pub context_degraded: bool,
}

impl From<&CommandOutcome> for CommandResponse {
    fn from(outcome: &CommandOutcome) -> Self {
        let report = &outcome.report;
        Self {
            success: report.overall_success,
            message: report.message.clone(),
            intent_type: report.workflow_type,
            results: report.results.iter().map(StepSummary::from).collect(),
            run_id: outcome.run_id.clone(),
            cancelled: report.cancelled,
            success_count: report.success_count,
            total_steps: report.total_steps,
            context_degraded: outcome
                .intent
                .as_ref()
                .map(|intent| intent.context_degraded)
                .unwrap_or(false),
        }
    }
}
