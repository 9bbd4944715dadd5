//! Command pipeline: context, classification, decomposition, execution.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use deskpilot_core::{
    traits::{CapabilityStatus, CommandHandler, ContextProvider},
    types::{Command, CommandOutcome, CommandRequest, ContextSnapshot, Intent, Plan, PlanPreview},
    Error, Result,
};
use deskpilot_governance::{track_command, CommandOutcomeLabel};

use crate::cancel::CancelHandle;
use crate::classifier::RuleClassifier;
use crate::decomposer::PlanDecomposer;
use crate::executor::PlanExecutor;

type RunTable = Arc<DashMap<String, CancelHandle>>;

/// Removes a run from the table when it ends, however it ends.
struct RunGuard {
    runs: RunTable,
    run_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.runs.remove(&self.run_id);
    }
}

/// The command handler used by every transport.
pub struct CommandPipeline {
    classifier: RuleClassifier,
    decomposer: PlanDecomposer,
    executor: PlanExecutor,
    context_provider: Option<Arc<dyn ContextProvider>>,
    runs: RunTable,
}

impl CommandPipeline {
    /// Create a new pipeline without a context provider.
    pub fn new(classifier: RuleClassifier, decomposer: PlanDecomposer, executor: PlanExecutor) -> Self {
        Self {
            classifier,
            decomposer,
            executor,
            context_provider: None,
            runs: Arc::new(DashMap::new()),
        }
    }

    /// Capture context from this provider when a request carries none.
    pub fn with_context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context_provider = Some(provider);
        self
    }

    pub fn classifier(&self) -> &RuleClassifier {
        &self.classifier
    }

    pub fn decomposer(&self) -> &PlanDecomposer {
        &self.decomposer
    }

    /// Client-supplied context wins; otherwise ask the provider. A failing
    /// provider yields `None`, which the classifier treats as degraded.
    async fn acquire_context(&self, supplied: Option<ContextSnapshot>) -> Option<ContextSnapshot> {
        if supplied.is_some() {
            return supplied;
        }
        let provider = self.context_provider.as_ref()?;
        match provider.snapshot().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "Context unavailable, classifying on text alone");
                None
            }
        }
    }

    async fn plan_for(&self, request: CommandRequest) -> Result<PlanPreview> {
        let text = request.command.trim();
        if text.is_empty() {
            return Err(Error::invalid_request("command must not be empty"));
        }

        let mut command = Command::new(text);
        command.context = self.acquire_context(request.context).await;

        let intent = self.classifier.classify(&command);
        let plan = self.decomposer.decompose(&intent);
        tracing::info!(
            workflow = %intent.tag,
            steps = plan.len(),
            context_degraded = intent.context_degraded,
            "Command planned"
        );
        Ok(PlanPreview { intent, plan })
    }

    async fn run(&self, intent: Option<Intent>, plan: Plan, started: Instant) -> Result<CommandOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let workflow = plan.workflow;
        let handle = CancelHandle::new();
        self.runs.insert(run_id.clone(), handle.clone());
        let _guard = RunGuard {
            runs: self.runs.clone(),
            run_id: run_id.clone(),
        };

        tracing::info!(run_id = %run_id, workflow = %workflow, steps = plan.len(), "Run started");
        let result = self.executor.execute_with_cancel(plan, &handle.token()).await;
        let latency = started.elapsed().as_secs_f64();

        match result {
            Ok(report) => {
                let label = if report.cancelled {
                    CommandOutcomeLabel::Cancelled
                } else if report.overall_success {
                    CommandOutcomeLabel::Success
                } else {
                    CommandOutcomeLabel::Failure
                };
                track_command(workflow.as_str(), label, latency);
                tracing::info!(
                    run_id = %run_id,
                    workflow = %workflow,
                    outcome = label.as_str(),
                    success_count = report.success_count,
                    total_steps = report.total_steps,
                    "Run finished"
                );
                Ok(CommandOutcome { run_id, intent, report })
            }
            Err(e) => {
                track_command(workflow.as_str(), CommandOutcomeLabel::Rejected, latency);
                tracing::warn!(run_id = %run_id, workflow = %workflow, error = %e, "Run rejected");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl CommandHandler for CommandPipeline {
    async fn handle(&self, request: CommandRequest) -> Result<CommandOutcome> {
        let started = Instant::now();
        let PlanPreview { intent, plan } = self.plan_for(request).await?;
        self.run(Some(intent), plan, started).await
    }

    async fn preview(&self, request: CommandRequest) -> Result<PlanPreview> {
        self.plan_for(request).await
    }

    async fn execute_plan(&self, plan: Plan) -> Result<CommandOutcome> {
        self.run(None, plan, Instant::now()).await
    }

    fn cancel(&self, run_id: &str) -> Result<()> {
        let handle = self
            .runs
            .get(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;
        handle.cancel();
        tracing::info!(run_id = %run_id, "Run cancellation requested");
        Ok(())
    }

    fn active_runs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runs.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    fn capabilities(&self) -> Vec<CapabilityStatus> {
        self.executor.registry().status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_core::{
        mocks::{FailingContextProvider, MockCapability, StaticContextProvider},
        traits::{CapabilityModule, CapabilityRegistry},
        types::{CandidateElement, WorkflowTag},
    };
    use deskpilot_skills::DefaultCapabilityRegistry;

    use crate::executor::SettlePolicy;

    async fn pipeline(modules: Vec<Arc<MockCapability>>) -> CommandPipeline {
        let registry = Arc::new(DefaultCapabilityRegistry::new());
        for module in modules {
            let name = module.name().to_string();
            registry
                .register(&name, module as Arc<dyn CapabilityModule>)
                .await
                .unwrap();
        }
        CommandPipeline::new(
            RuleClassifier::default(),
            PlanDecomposer::with_defaults().unwrap(),
            PlanExecutor::new(registry).with_settle(SettlePolicy::Immediate),
        )
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let pipeline = pipeline(Vec::new()).await;
        let err = pipeline.handle(CommandRequest::text("   ")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_supplied_context_skips_provider() {
        let provider = Arc::new(StaticContextProvider::new(ContextSnapshot::new("Slack")));
        let pipeline = pipeline(Vec::new()).await.with_context_provider(provider.clone());

        let context = ContextSnapshot::new("Messenger").with_candidate(CandidateElement::actor("Alice"));
        let preview = pipeline
            .preview(CommandRequest::text("open messenger and go to alice").with_context(context))
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 0);
        assert_eq!(preview.intent.context.active_surface, "Messenger");
        assert_eq!(preview.plan.steps[1].params["user"], "Alice");
    }

    #[tokio::test]
    async fn test_provider_fills_missing_context() {
        let snapshot = ContextSnapshot::new("Slack").with_candidate(CandidateElement::button("Send"));
        let provider = Arc::new(StaticContextProvider::new(snapshot));
        let pipeline = pipeline(Vec::new()).await.with_context_provider(provider.clone());

        let preview = pipeline.preview(CommandRequest::text("press send")).await.unwrap();

        assert_eq!(provider.call_count(), 1);
        assert!(!preview.intent.context_degraded);
        assert_eq!(preview.intent.tag, WorkflowTag::ClickTargetControl);
    }

    #[tokio::test]
    async fn test_failing_provider_degrades() {
        let pipeline = pipeline(Vec::new())
            .await
            .with_context_provider(Arc::new(FailingContextProvider::new("screen locked")));

        let preview = pipeline.preview(CommandRequest::text("press send")).await.unwrap();
        assert!(preview.intent.context_degraded);
        assert_eq!(preview.intent.tag, WorkflowTag::General);
        assert!(preview.plan.context_degraded);
    }

    #[tokio::test]
    async fn test_runs_are_untracked_after_completion() {
        let inference = Arc::new(MockCapability::new("ai_inference", &["analyze"]));
        let pipeline = pipeline(vec![inference]).await;

        let outcome = pipeline.handle(CommandRequest::text("tell me a joke")).await.unwrap();

        assert!(outcome.report.overall_success);
        assert!(!outcome.run_id.is_empty());
        assert!(pipeline.active_runs().is_empty());
        assert!(matches!(pipeline.cancel(&outcome.run_id), Err(Error::RunNotFound(_))));
    }

    #[tokio::test]
    async fn test_capabilities_reflect_registry() {
        let pipeline = pipeline(vec![
            Arc::new(MockCapability::new("screen", &["capture"])),
            Arc::new(MockCapability::new("browser", &["open_url"])),
        ])
        .await;

        let names: Vec<String> = pipeline.capabilities().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["screen", "browser"]);
    }
}
