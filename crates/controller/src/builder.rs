//! Builder for CommandPipeline.

use std::sync::Arc;

use deskpilot_core::{
    config::{AppConfig, ExecutorConfig},
    traits::{CapabilityRegistry, ContextProvider},
    Error, Result,
};

use crate::classifier::RuleClassifier;
use crate::decomposer::{default_templates, PlanDecomposer};
use crate::entities::EntityCatalog;
use crate::executor::PlanExecutor;
use crate::pipeline::CommandPipeline;

/// Builder for constructing a CommandPipeline.
pub struct PipelineBuilder {
    registry: Option<Arc<dyn CapabilityRegistry>>,
    classifier: Option<RuleClassifier>,
    decomposer: Option<PlanDecomposer>,
    executor_config: ExecutorConfig,
    context_provider: Option<Arc<dyn ContextProvider>>,
}

impl PipelineBuilder {
    /// Create a new builder with built-in rules and templates.
    pub fn new() -> Self {
        Self {
            registry: None,
            classifier: None,
            decomposer: None,
            executor_config: ExecutorConfig::default(),
            context_provider: None,
        }
    }

    /// Create a builder from the application config.
    ///
    /// Rule, entity and template tables are read from the configured paths
    /// when set. The registry and context provider are still to be supplied.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let classifier = match &config.classifier.rules_path {
            Some(path) => {
                tracing::info!(path = %path, "Loading classification rules");
                RuleClassifier::from_file(path)?
            }
            None => RuleClassifier::default(),
        };

        let decomposer_config = &config.decomposer;
        let catalog = match &decomposer_config.entities_path {
            Some(path) => {
                tracing::info!(path = %path, "Loading entity catalog");
                EntityCatalog::from_file(path)?
            }
            None => EntityCatalog::builtin(),
        };
        let templates = match &decomposer_config.templates_path {
            Some(path) => {
                tracing::info!(path = %path, "Loading workflow templates");
                PlanDecomposer::templates_from_file(path)?
            }
            None => default_templates(),
        };
        let decomposer =
            PlanDecomposer::new(templates, catalog)?.with_mailbox_url(decomposer_config.mailbox_url.clone());

        Ok(Self::new()
            .with_classifier(classifier)
            .with_decomposer(decomposer)
            .with_executor_config(config.executor.clone()))
    }

    /// Set the capability registry. Required.
    pub fn with_registry(mut self, registry: Arc<dyn CapabilityRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the classifier.
    pub fn with_classifier(mut self, classifier: RuleClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Set the decomposer.
    pub fn with_decomposer(mut self, decomposer: PlanDecomposer) -> Self {
        self.decomposer = Some(decomposer);
        self
    }

    /// Set the executor policies.
    pub fn with_executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor_config = config;
        self
    }

    /// Set the context provider.
    pub fn with_context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context_provider = Some(provider);
        self
    }

    /// Build the CommandPipeline.
    pub fn build(self) -> Result<CommandPipeline> {
        let registry = self
            .registry
            .ok_or_else(|| Error::Config("a capability registry is required".to_string()))?;

        let decomposer = match self.decomposer {
            Some(decomposer) => decomposer,
            None => PlanDecomposer::with_defaults()?,
        };
        let executor = PlanExecutor::from_config(registry, &self.executor_config);

        let pipeline = CommandPipeline::new(self.classifier.unwrap_or_default(), decomposer, executor);
        Ok(match self.context_provider {
            Some(provider) => pipeline.with_context_provider(provider),
            None => pipeline,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_core::{traits::CommandHandler, types::CommandRequest};
    use deskpilot_skills::DefaultCapabilityRegistry;
    use std::io::Write as _;

    #[test]
    fn test_registry_is_required() {
        assert!(matches!(PipelineBuilder::new().build(), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_from_config_loads_rule_file() {
        let path = std::env::temp_dir().join(format!("deskpilot-rules-{}.yaml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "- name: ping\n  tag: open_mailbox\n  keywords: [[ping]]").unwrap();
        drop(file);

        let mut config = AppConfig::default();
        config.classifier.rules_path = Some(path.display().to_string());
        config.decomposer.mailbox_url = "https://mail.example.com".into();

        let pipeline = PipelineBuilder::from_config(&config)
            .unwrap()
            .with_registry(Arc::new(DefaultCapabilityRegistry::new()))
            .build()
            .unwrap();
        std::fs::remove_file(&path).ok();

        let preview = pipeline.preview(CommandRequest::text("ping")).await.unwrap();
        assert_eq!(preview.intent.matched_rule.as_deref(), Some("ping"));
        assert_eq!(preview.plan.steps[0].params["url"], "https://mail.example.com");
    }

    #[test]
    fn test_from_config_missing_file() {
        let mut config = AppConfig::default();
        config.decomposer.entities_path = Some("/nonexistent/entities.yaml".into());
        assert!(matches!(PipelineBuilder::from_config(&config), Err(Error::Config(_))));
    }
}
