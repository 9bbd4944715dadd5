//! Plan executor.
//!
//! Runs plan steps strictly in ordinal order through the capability
//! registry. A failing, unavailable or panicking step never aborts the run:
//! it is recorded as an unverified failure and the next step proceeds.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use deskpilot_core::{
    config::ExecutorConfig,
    traits::CapabilityRegistry,
    types::{ExecutionReport, Plan, RunState, Step, StepResult, SuccessPolicy, VerificationPolicy},
    Result,
};
use deskpilot_governance::track_step;

use crate::cancel::CancelToken;

/// Pause inserted between consecutive steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    Immediate,
    Fixed(Duration),
}

impl SettlePolicy {
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::Immediate
        } else {
            Self::Fixed(Duration::from_millis(ms))
        }
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Immediate => None,
            Self::Fixed(delay) => Some(*delay),
        }
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(1))
    }
}

/// Sequential plan executor.
pub struct PlanExecutor {
    registry: Arc<dyn CapabilityRegistry>,
    settle: SettlePolicy,
    verification: VerificationPolicy,
    success: SuccessPolicy,
}

impl PlanExecutor {
    /// Create a new executor with default policies.
    pub fn new(registry: Arc<dyn CapabilityRegistry>) -> Self {
        Self {
            registry,
            settle: SettlePolicy::default(),
            verification: VerificationPolicy::default(),
            success: SuccessPolicy::default(),
        }
    }

    /// Create an executor from the `executor` config section.
    pub fn from_config(registry: Arc<dyn CapabilityRegistry>, config: &ExecutorConfig) -> Self {
        Self::new(registry)
            .with_settle(SettlePolicy::from_millis(config.settle_delay_ms))
            .with_verification(config.verification)
            .with_success_policy(config.success_policy)
    }

    pub fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_verification(mut self, verification: VerificationPolicy) -> Self {
        self.verification = verification;
        self
    }

    pub fn with_success_policy(mut self, success: SuccessPolicy) -> Self {
        self.success = success;
        self
    }

    pub fn registry(&self) -> &Arc<dyn CapabilityRegistry> {
        &self.registry
    }

    /// Execute a plan to completion.
    pub async fn execute(&self, plan: Plan) -> Result<ExecutionReport> {
        self.execute_with_cancel(plan, &CancelToken::never()).await
    }

    /// Execute a plan, checking `cancel` before every step.
    ///
    /// An empty plan yields the "no executable steps" report. A structurally
    /// invalid plan fails with `InvalidStep` before any step runs.
    pub async fn execute_with_cancel(&self, plan: Plan, cancel: &CancelToken) -> Result<ExecutionReport> {
        if plan.is_empty() {
            tracing::debug!(workflow = %plan.workflow, "Plan has no steps");
            return Ok(ExecutionReport::no_steps(plan.workflow));
        }
        plan.validate()?;

        let verification = if plan.context_degraded {
            VerificationPolicy::Lenient
        } else {
            self.verification
        };

        let workflow = plan.workflow;
        let total_steps = plan.len();
        let mut results = Vec::with_capacity(total_steps);
        let mut state = RunState::Pending;

        for (index, step) in plan.steps.into_iter().enumerate() {
            if index > 0 {
                if let Some(delay) = self.settle.delay() {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                }
            }

            if cancel.is_cancelled() {
                state = RunState::Cancelled;
                tracing::debug!(workflow = %workflow, ?state, "Run cancelled before step {}", step.ordinal);
                break;
            }

            state = RunState::Running(step.ordinal);
            tracing::debug!(workflow = %workflow, ?state, step = %step.target(), "Executing step");

            results.push(self.run_step(step, verification).await);
        }

        if state != RunState::Cancelled {
            state = RunState::Completed;
        }

        let success_count = results.iter().filter(|r| r.is_verified_success()).count();
        let cancelled = state == RunState::Cancelled;
        let message = if cancelled {
            format!("{} cancelled after {}/{} steps", workflow, results.len(), total_steps)
        } else {
            format!("{} finished: {}/{} steps succeeded", workflow, success_count, total_steps)
        };

        tracing::debug!(workflow = %workflow, ?state, success_count, total_steps, "Run finished");

        Ok(ExecutionReport {
            overall_success: self.success.judge(success_count, total_steps),
            results,
            success_count,
            total_steps,
            workflow_type: workflow,
            cancelled,
            state,
            message,
        })
    }

    async fn run_step(&self, step: Step, verification: VerificationPolicy) -> StepResult {
        let outcome = {
            let call = self
                .registry
                .invoke(&step.module, &step.operation, step.params.clone());
            AssertUnwindSafe(call).catch_unwind().await
        };

        match outcome {
            Ok(Ok(output)) => {
                let verified = verification.verify(&output);
                track_step(
                    &step.module,
                    &step.operation,
                    if verified { "verified" } else { "unverified" },
                );
                if !output.success {
                    tracing::warn!(step = %step.target(), message = %output.message, "Step reported failure");
                }
                StepResult {
                    step,
                    success: output.success,
                    verified,
                    message: output.message,
                    payload: output.payload,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(step = %step.target(), error = %e, "Step failed");
                track_step(&step.module, &step.operation, "failed");
                StepResult::failed(step, e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::warn!(step = %step.target(), panic = %reason, "Step panicked");
                track_step(&step.module, &step.operation, "panicked");
                StepResult::failed(step, format!("capability panicked: {}", reason))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
