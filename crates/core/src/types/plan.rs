use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::intent::{Intent, WorkflowTag};
use crate::error::{Error, Result};

/// Parameter bag passed to a capability operation.
///
/// Required keys are documented per `(module, operation)` and validated by
/// the module, never by the core.
pub type ParamBag = serde_json::Map<String, Value>;

// =============================================================================
// Plan Types (decomposer output)
// =============================================================================

/// One capability invocation within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Execution position, contiguous from 1.
    pub ordinal: usize,
    /// Target capability module.
    #[serde(default)]
    pub module: String,
    /// Operation on the module.
    #[serde(default)]
    pub operation: String,
    /// Operation parameters.
    #[serde(default)]
    pub params: ParamBag,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl Step {
    /// Create a step without parameters.
    pub fn new(ordinal: usize, module: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            ordinal,
            module: module.into(),
            operation: operation.into(),
            params: ParamBag::new(),
            description: String::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// `module.operation` label.
    pub fn target(&self) -> String {
        format!("{}.{}", self.module, self.operation)
    }
}

/// Ordered steps bound to one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Workflow the plan was decomposed from.
    pub workflow: WorkflowTag,
    /// Command the plan was decomposed from.
    #[serde(default)]
    pub raw_command: String,
    /// Carried over from the intent; loosens verification.
    #[serde(default)]
    pub context_degraded: bool,
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl Plan {
    /// Create a plan outside the decomposer (caller-supplied steps).
    pub fn new(workflow: WorkflowTag, steps: Vec<Step>) -> Self {
        Self {
            workflow,
            raw_command: String::new(),
            context_degraded: false,
            steps,
        }
    }

    /// Create a plan bound to an intent.
    pub fn for_intent(intent: &Intent, steps: Vec<Step>) -> Self {
        Self {
            workflow: intent.tag,
            raw_command: intent.raw_command.clone(),
            context_degraded: intent.context_degraded,
            steps,
        }
    }

    /// Whether the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check the plan is well-formed.
    ///
    /// Every step must name a module and an operation, and ordinals must be
    /// contiguous starting at 1. An empty plan is reported as invalid here;
    /// the executor short-circuits empty plans before calling this.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::invalid_step(0, "plan has no steps"));
        }

        for (index, step) in self.steps.iter().enumerate() {
            let expected = index + 1;
            if step.ordinal != expected {
                return Err(Error::invalid_step(
                    step.ordinal,
                    format!("expected ordinal {}, ordinals must be contiguous from 1", expected),
                ));
            }
            if step.module.trim().is_empty() {
                return Err(Error::invalid_step(step.ordinal, "missing module"));
            }
            if step.operation.trim().is_empty() {
                return Err(Error::invalid_step(step.ordinal, "missing operation"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_plan() -> Plan {
        Plan::new(
            WorkflowTag::FindAndJoinChannel,
            vec![
                Step::new(1, "messaging", "search_channels").with_param("channel", "general"),
                Step::new(2, "messaging", "join_channel").with_param("channel", "general"),
            ],
        )
    }

    #[test]
    fn test_valid_plan() {
        assert!(two_step_plan().validate().is_ok());
    }

    #[test]
    fn test_missing_operation_is_invalid() {
        let mut plan = two_step_plan();
        plan.steps[1].operation.clear();

        match plan.validate() {
            Err(Error::InvalidStep { ordinal, reason }) => {
                assert_eq!(ordinal, 2);
                assert!(reason.contains("operation"));
            }
            other => panic!("Expected InvalidStep, got {:?}", other),
        }
    }

    #[test]
    fn test_gap_in_ordinals_is_invalid() {
        let mut plan = two_step_plan();
        plan.steps[1].ordinal = 3;
        assert!(matches!(plan.validate(), Err(Error::InvalidStep { ordinal: 3, .. })));
    }

    #[test]
    fn test_empty_plan_is_invalid() {
        let plan = Plan::new(WorkflowTag::General, Vec::new());
        assert!(plan.is_empty());
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_step_deserializes_without_params() {
        let step: Step =
            serde_json::from_str(r#"{"ordinal": 1, "module": "screen", "operation": "capture"}"#)
                .unwrap();
        assert!(step.params.is_empty());
        assert_eq!(step.target(), "screen.capture");
    }
}
