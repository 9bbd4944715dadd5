//! Mock implementations of core traits for testing.
//!
//! Shared by the unit and integration tests of every crate in the workspace.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    traits::{CapabilityModule, CapabilityStatus, CommandHandler, ContextProvider, InferenceBackend},
    types::{
        CapabilityOutput, CommandOutcome, CommandRequest, ContextSnapshot, ExecutionReport, Intent,
        ParamBag, Plan, PlanPreview, RunState, Step, StepResult, WorkflowTag,
    },
    Error, Result,
};

// =============================================================================
// Mock Capability Module
// =============================================================================

/// Scripted response of a mock operation.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this output.
    Output(CapabilityOutput),
    /// Fail with a module error carrying this message.
    Fail(String),
    /// Panic with this message.
    Panic(String),
}

type InvokeHook = Arc<dyn Fn(&str, &ParamBag) + Send + Sync>;

/// Capability module whose operations return scripted results and record calls.
pub struct MockCapability {
    name: String,
    operations: Vec<String>,
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    init_error: Option<String>,
    calls: Mutex<Vec<(String, ParamBag)>>,
    hook: Option<InvokeHook>,
}

impl MockCapability {
    /// Create a mock exposing the given operations, all succeeding.
    pub fn new(name: &str, operations: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            operations: operations.iter().map(|op| op.to_string()).collect(),
            behaviors: Mutex::new(HashMap::new()),
            init_error: None,
            calls: Mutex::new(Vec::new()),
            hook: None,
        }
    }

    /// Script the output of an operation.
    pub fn with_output(self, operation: &str, output: CapabilityOutput) -> Self {
        self.script(operation, MockBehavior::Output(output))
    }

    /// Script an operation to fail.
    pub fn with_failure(self, operation: &str, message: &str) -> Self {
        self.script(operation, MockBehavior::Fail(message.to_string()))
    }

    /// Script an operation to panic.
    pub fn with_panic(self, operation: &str, message: &str) -> Self {
        self.script(operation, MockBehavior::Panic(message.to_string()))
    }

    /// Make `initialize` fail.
    pub fn failing_init(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_string());
        self
    }

    /// Run a callback on every invocation, before the scripted behaviour.
    pub fn on_invoke(mut self, hook: impl Fn(&str, &ParamBag) + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    fn script(self, operation: &str, behavior: MockBehavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .insert(operation.to_string(), behavior);
        self
    }

    /// Recorded `(operation, params)` pairs, in call order.
    pub fn calls(&self) -> Vec<(String, ParamBag)> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded operation names, in call order.
    pub fn called_operations(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(op, _)| op.clone()).collect()
    }

    /// Number of invocations.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CapabilityModule for MockCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Scripted test capability"
    }

    async fn initialize(&self) -> Result<()> {
        match &self.init_error {
            Some(message) => Err(Error::module(&self.name, message.clone())),
            None => Ok(()),
        }
    }

    fn operations(&self) -> Vec<String> {
        self.operations.clone()
    }

    async fn invoke(&self, operation: &str, params: ParamBag) -> Result<CapabilityOutput> {
        if !self.operations.iter().any(|op| op == operation) {
            return Err(Error::operation_not_found(&self.name, operation));
        }

        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), params.clone()));

        if let Some(hook) = &self.hook {
            hook(operation, &params);
        }

        let behavior = self.behaviors.lock().unwrap().get(operation).cloned();
        match behavior {
            Some(MockBehavior::Output(output)) => Ok(output),
            Some(MockBehavior::Fail(message)) => Err(Error::module(&self.name, message)),
            Some(MockBehavior::Panic(message)) => panic!("{}", message),
            None => Ok(CapabilityOutput::ok(format!("{}.{} done", self.name, operation))),
        }
    }
}

// =============================================================================
// Mock Context Providers
// =============================================================================

/// Provider returning a fixed snapshot.
pub struct StaticContextProvider {
    snapshot: ContextSnapshot,
    calls: AtomicUsize,
}

impl StaticContextProvider {
    /// Create a provider that always returns `snapshot`.
    pub fn new(snapshot: ContextSnapshot) -> Self {
        Self {
            snapshot,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of snapshots taken.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextProvider for StaticContextProvider {
    async fn snapshot(&self) -> Result<ContextSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot.clone())
    }
}

/// Provider that always fails.
pub struct FailingContextProvider {
    reason: String,
}

impl FailingContextProvider {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ContextProvider for FailingContextProvider {
    async fn snapshot(&self) -> Result<ContextSnapshot> {
        Err(Error::ContextUnavailable(self.reason.clone()))
    }
}

// =============================================================================
// Mock Inference Backend
// =============================================================================

/// Inference backend returning canned completions.
pub struct MockInference {
    response: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockInference {
    /// Echo the prompt back, prefixed.
    pub fn echo() -> Self {
        Self {
            response: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always return `response`.
    pub fn constant(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for MockInference {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .response
            .clone()
            .unwrap_or_else(|| format!("completion: {}", prompt)))
    }
}

// =============================================================================
// Mock Command Handler
// =============================================================================

/// Command handler that reports every step as verified without running anything.
///
/// Plans are still validated, so structural errors surface as they would in
/// the real pipeline.
pub struct MockCommandHandler {
    requests: Mutex<Vec<CommandRequest>>,
    active: Mutex<Vec<String>>,
    capabilities: Vec<CapabilityStatus>,
    counter: AtomicUsize,
}

impl MockCommandHandler {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            active: Mutex::new(Vec::new()),
            capabilities: Vec::new(),
            counter: AtomicUsize::new(0),
        }
    }

    /// Pretend a run with this id is in flight.
    pub fn with_active_run(self, run_id: &str) -> Self {
        self.active.lock().unwrap().push(run_id.to_string());
        self
    }

    /// Report these capabilities.
    pub fn with_capabilities(mut self, capabilities: Vec<CapabilityStatus>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Requests received by `handle`, in call order.
    pub fn requests(&self) -> Vec<CommandRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_run_id(&self) -> String {
        format!("mock-run-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn intent_for(request: &CommandRequest) -> Intent {
        Intent {
            tag: WorkflowTag::General,
            raw_command: request.command.clone(),
            context: request.context.clone().unwrap_or_default(),
            extracted_at: chrono::Utc::now(),
            context_degraded: request.context.is_none(),
            matched_rule: None,
        }
    }

    fn plan_for(intent: &Intent) -> Plan {
        Plan::for_intent(
            intent,
            vec![Step::new(1, "ai_inference", "analyze")
                .with_param("prompt", intent.raw_command.clone())
                .with_description("Analyze the command")],
        )
    }

    fn run(&self, plan: &Plan) -> ExecutionReport {
        let results: Vec<StepResult> = plan
            .steps
            .iter()
            .map(|step| StepResult {
                step: step.clone(),
                success: true,
                verified: true,
                message: format!("{} done", step.target()),
                payload: ParamBag::new(),
            })
            .collect();
        let total = results.len();
        ExecutionReport {
            overall_success: total > 0,
            results,
            success_count: total,
            total_steps: total,
            workflow_type: plan.workflow,
            cancelled: false,
            state: RunState::Completed,
            message: format!("{} finished: {}/{} steps succeeded", plan.workflow, total, total),
        }
    }
}

impl Default for MockCommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandHandler for MockCommandHandler {
    async fn handle(&self, request: CommandRequest) -> Result<CommandOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        let intent = Self::intent_for(&request);
        let report = self.run(&Self::plan_for(&intent));
        Ok(CommandOutcome {
            run_id: self.next_run_id(),
            intent: Some(intent),
            report,
        })
    }

    async fn preview(&self, request: CommandRequest) -> Result<PlanPreview> {
        let intent = Self::intent_for(&request);
        let plan = Self::plan_for(&intent);
        Ok(PlanPreview { intent, plan })
    }

    async fn execute_plan(&self, plan: Plan) -> Result<CommandOutcome> {
        if plan.is_empty() {
            return Ok(CommandOutcome {
                run_id: self.next_run_id(),
                intent: None,
                report: ExecutionReport::no_steps(plan.workflow),
            });
        }
        plan.validate()?;
        Ok(CommandOutcome {
            run_id: self.next_run_id(),
            intent: None,
            report: self.run(&plan),
        })
    }

    fn cancel(&self, run_id: &str) -> Result<()> {
        let mut active = self.active.lock().unwrap();
        match active.iter().position(|id| id == run_id) {
            Some(index) => {
                active.remove(index);
                Ok(())
            }
            None => Err(Error::RunNotFound(run_id.to_string())),
        }
    }

    fn active_runs(&self) -> Vec<String> {
        self.active.lock().unwrap().clone()
    }

    fn capabilities(&self) -> Vec<CapabilityStatus> {
        self.capabilities.clone()
    }
}
