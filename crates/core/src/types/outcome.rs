use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::intent::WorkflowTag;
use super::plan::{ParamBag, Step};

// =============================================================================
// Capability Output
// =============================================================================

/// Result record returned by a capability operation.
///
/// On the wire the payload fields are flattened next to `success`,
/// `message` and the optional `verification` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOutput {
    /// Whether the module reports the operation as done.
    pub success: bool,
    /// Human-readable outcome.
    #[serde(default)]
    pub message: String,
    /// Independent confirmation, when the module can re-check its effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<bool>,
    /// Arbitrary module-specific fields.
    #[serde(flatten)]
    pub payload: ParamBag,
}

impl CapabilityOutput {
    /// Create a successful output.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            verification: None,
            payload: ParamBag::new(),
        }
    }

    /// Create a failed output.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            verification: None,
            payload: ParamBag::new(),
        }
    }

    /// Attach an explicit verification signal.
    pub fn with_verification(mut self, verified: bool) -> Self {
        self.verification = Some(verified);
        self
    }

    /// Attach a payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Step & Execution Results
// =============================================================================

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// The step that ran.
    pub step: Step,
    /// Module-reported success.
    pub success: bool,
    /// Independently confirmed (see `VerificationPolicy`).
    pub verified: bool,
    /// Outcome or error message.
    pub message: String,
    /// Module payload.
    #[serde(default)]
    pub payload: ParamBag,
}

impl StepResult {
    /// A failed, unverified result carrying an error message.
    pub fn failed(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            success: false,
            verified: false,
            message: message.into(),
            payload: ParamBag::new(),
        }
    }

    /// Whether the step counts towards the success count.
    pub fn is_verified_success(&self) -> bool {
        self.success && self.verified
    }
}

/// Lifecycle of one plan execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    /// Running the step with this ordinal.
    Running(usize),
    Completed,
    /// Stopped between steps by the caller.
    Cancelled,
    /// Nothing was attempted.
    Aborted,
}

/// Aggregate result of executing a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// Overall verdict under the executor's success policy.
    pub overall_success: bool,
    /// Per-step results, in ordinal order.
    pub results: Vec<StepResult>,
    /// Steps that succeeded and were verified.
    pub success_count: usize,
    /// Steps in the plan, attempted or not.
    pub total_steps: usize,
    /// Workflow the plan came from.
    pub workflow_type: WorkflowTag,
    /// Whether the caller cancelled the run.
    pub cancelled: bool,
    /// Final lifecycle state.
    pub state: RunState,
    /// Summary line.
    pub message: String,
}

impl ExecutionReport {
    /// Report for a plan with nothing to execute.
    pub fn no_steps(workflow_type: WorkflowTag) -> Self {
        Self {
            overall_success: false,
            results: Vec::new(),
            success_count: 0,
            total_steps: 0,
            workflow_type,
            cancelled: false,
            state: RunState::Aborted,
            message: "no executable steps".to_string(),
        }
    }
}
