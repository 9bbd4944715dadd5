//! Table-driven plan decomposer.
//!
//! Each workflow tag maps to a fixed template of steps. Parameters are
//! either resolved entities, rendered text templates or literal values, so a
//! new workflow is a new table row and never new control flow.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use deskpilot_core::{
    template::{TemplateSet, TemplateVars},
    types::{Intent, Plan, Step, WorkflowTag},
    Error, Result,
};

use crate::entities::{EntityCatalog, EntityExtractor, EntityKind, EntitySource};

/// Template variable holding the raw command.
pub const COMMAND_VAR: &str = "command";
/// Template variable holding the configured mailbox URL.
pub const MAILBOX_URL_VAR: &str = "mailbox_url";

/// How one step parameter is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    /// The resolved entity of this kind.
    Entity { entity: EntityKind },
    /// A text template over `command`, `mailbox_url` and every entity kind.
    Text { text: String },
    /// A literal value.
    Value { value: Value },
}

/// One step of a workflow template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTemplate {
    pub module: String,
    pub operation: String,
    /// Text template for the step description.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
}

impl StepTemplate {
    pub fn new(module: &str, operation: &str, description: &str) -> Self {
        Self {
            module: module.to_string(),
            operation: operation.to_string(),
            description: description.to_string(),
            params: BTreeMap::new(),
        }
    }

    /// Bind a parameter to a resolved entity.
    pub fn entity(mut self, key: &str, kind: EntityKind) -> Self {
        self.params.insert(key.to_string(), ParamSpec::Entity { entity: kind });
        self
    }

    /// Bind a parameter to a text template.
    pub fn text(mut self, key: &str, template: &str) -> Self {
        self.params.insert(
            key.to_string(),
            ParamSpec::Text {
                text: template.to_string(),
            },
        );
        self
    }

    /// Bind a parameter to a literal value.
    pub fn value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), ParamSpec::Value { value: value.into() });
        self
    }
}

/// Ordered step templates for one workflow tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub tag: WorkflowTag,
    pub steps: Vec<StepTemplate>,
}

impl WorkflowTemplate {
    pub fn new(tag: WorkflowTag, steps: Vec<StepTemplate>) -> Self {
        Self { tag, steps }
    }
}

/// The built-in template table.
pub fn default_templates() -> Vec<WorkflowTemplate> {
    use EntityKind::*;

    vec![
        WorkflowTemplate::new(
            WorkflowTag::ComplexWorkflow,
            vec![
                StepTemplate::new("automation", "launch_app", "Launch {{ app }}").entity("app", App),
                StepTemplate::new("automation", "navigate_to_user", "Open the conversation with {{ user }}")
                    .entity("user", User),
            ],
        ),
        WorkflowTemplate::new(
            WorkflowTag::AnalyzeLastMessage,
            vec![
                StepTemplate::new("messaging", "read_last_message", "Read the last message")
                    .entity("user", User),
                StepTemplate::new("ai_inference", "analyze", "Explain what the message means")
                    .text("prompt", "Explain what the last message means")
                    .text("context", "{{ command }}"),
            ],
        ),
        WorkflowTemplate::new(
            WorkflowTag::FindAndJoinChannel,
            vec![
                StepTemplate::new("messaging", "search_channels", "Search for {{ channel }}")
                    .entity("channel", Channel),
                StepTemplate::new("messaging", "join_channel", "Join {{ channel }}").entity("channel", Channel),
            ],
        ),
        WorkflowTemplate::new(
            WorkflowTag::ClickTargetControl,
            vec![
                StepTemplate::new("screen", "detect_buttons", "Detect buttons on screen"),
                StepTemplate::new("automation", "find_and_click", "Click {{ control }}")
                    .entity("target", Control),
            ],
        ),
        WorkflowTemplate::new(
            WorkflowTag::FilterAndSummarize,
            vec![
                StepTemplate::new("messaging", "filter_messages_by_user", "Collect messages from {{ user }}")
                    .entity("user", User),
                StepTemplate::new("ai_inference", "summarize", "Summarize the messages from {{ user }}")
                    .text("prompt", "Summarize the messages from {{ user }}")
                    .text("context", "{{ command }}"),
            ],
        ),
        WorkflowTemplate::new(
            WorkflowTag::ActivateExtension,
            vec![
                StepTemplate::new("browser", "list_extensions", "List installed extensions"),
                StepTemplate::new("browser", "activate_extension", "Activate {{ extension }}")
                    .entity("extension", Extension),
            ],
        ),
        WorkflowTemplate::new(
            WorkflowTag::OpenMailbox,
            vec![StepTemplate::new("browser", "open_url", "Open the mailbox").text("url", "{{ mailbox_url }}")],
        ),
        WorkflowTemplate::new(
            WorkflowTag::LaunchApplication,
            vec![StepTemplate::new("automation", "launch_app", "Launch {{ app }}").entity("app", App)],
        ),
        WorkflowTemplate::new(WorkflowTag::General, vec![general_fallback()]),
    ]
}

fn general_fallback() -> StepTemplate {
    StepTemplate::new("ai_inference", "analyze", "Analyze the command").text("prompt", "{{ command }}")
}

fn description_key(tag: WorkflowTag, index: usize) -> String {
    format!("{}.{}.description", tag, index)
}

fn param_key(tag: WorkflowTag, index: usize, param: &str) -> String {
    format!("{}.{}.param.{}", tag, index, param)
}

/// Turns intents into plans.
pub struct PlanDecomposer {
    templates: BTreeMap<WorkflowTag, WorkflowTemplate>,
    texts: TemplateSet,
    extractor: EntityExtractor,
    mailbox_url: String,
}

impl PlanDecomposer {
    /// Create a decomposer, compiling every text template up front.
    ///
    /// A `General` row is added when missing so the fallback always has a step.
    pub fn new(templates: Vec<WorkflowTemplate>, catalog: EntityCatalog) -> Result<Self> {
        let mut table = BTreeMap::new();
        let mut seen = HashSet::new();
        for template in templates {
            if !seen.insert(template.tag) {
                return Err(Error::Template(format!("duplicate template for {}", template.tag)));
            }
            table.insert(template.tag, template);
        }

        let general = table
            .entry(WorkflowTag::General)
            .or_insert_with(|| WorkflowTemplate::new(WorkflowTag::General, Vec::new()));
        if general.steps.is_empty() {
            general.steps.push(general_fallback());
        }

        let mut texts = TemplateSet::new();
        for template in table.values() {
            for (index, step) in template.steps.iter().enumerate() {
                if step.module.trim().is_empty() || step.operation.trim().is_empty() {
                    return Err(Error::Template(format!(
                        "{} step {} must name a module and an operation",
                        template.tag,
                        index + 1
                    )));
                }
                texts.add(&description_key(template.tag, index), &step.description)?;
                for (key, spec) in &step.params {
                    if let ParamSpec::Text { text } = spec {
                        texts.add(&param_key(template.tag, index, key), text)?;
                    }
                }
            }
        }

        Ok(Self {
            templates: table,
            texts,
            extractor: EntityExtractor::new(catalog),
            mailbox_url: "https://mail.google.com".to_string(),
        })
    }

    /// Built-in templates and catalog.
    pub fn with_defaults() -> Result<Self> {
        Self::new(default_templates(), EntityCatalog::builtin())
    }

    /// Parse a template table from YAML.
    pub fn templates_from_yaml(yaml: &str) -> Result<Vec<WorkflowTemplate>> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Template(e.to_string()))
    }

    /// Load a template table from a YAML file.
    pub fn templates_from_file(path: impl AsRef<Path>) -> Result<Vec<WorkflowTemplate>> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::templates_from_yaml(&yaml)
    }

    /// Set the URL the `OpenMailbox` workflow opens.
    pub fn with_mailbox_url(mut self, url: impl Into<String>) -> Self {
        self.mailbox_url = url.into();
        self
    }

    pub fn template(&self, tag: WorkflowTag) -> Option<&WorkflowTemplate> {
        self.templates.get(&tag)
    }

    /// Produce the plan for an intent.
    ///
    /// A tag without a table row yields an empty plan. Ordinals are
    /// contiguous from 1.
    pub fn decompose(&self, intent: &Intent) -> Plan {
        let Some(template) = self.templates.get(&intent.tag) else {
            tracing::debug!(workflow = %intent.tag, "No template for workflow");
            return Plan::for_intent(intent, Vec::new());
        };

        let vars = self.resolve_vars(intent);

        let steps = template
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let mut built = Step::new(index + 1, step.module.clone(), step.operation.clone())
                    .with_description(self.render(&description_key(intent.tag, index), &step.description, &vars));

                for (key, spec) in &step.params {
                    let value = match spec {
                        ParamSpec::Entity { entity } => Value::String(
                            vars.get(entity.as_str())
                                .cloned()
                                .unwrap_or_else(|| entity.placeholder()),
                        ),
                        ParamSpec::Text { text } => {
                            Value::String(self.render(&param_key(intent.tag, index, key), text, &vars))
                        }
                        ParamSpec::Value { value } => value.clone(),
                    };
                    built.params.insert(key.clone(), value);
                }
                built
            })
            .collect();

        Plan::for_intent(intent, steps)
    }

    fn resolve_vars(&self, intent: &Intent) -> TemplateVars {
        let mut vars = TemplateVars::new();
        vars.insert(COMMAND_VAR.to_string(), intent.raw_command.clone());
        vars.insert(MAILBOX_URL_VAR.to_string(), self.mailbox_url.clone());

        for kind in EntityKind::ALL {
            let extracted = self.extractor.extract(kind, &intent.raw_command, &intent.context);
            if extracted.source != EntitySource::Placeholder {
                tracing::debug!(entity = %kind, value = %extracted.value, source = ?extracted.source, "Entity resolved");
            }
            vars.insert(kind.as_str().to_string(), extracted.value);
        }
        vars
    }

    fn render(&self, key: &str, source: &str, vars: &TemplateVars) -> String {
        match self.texts.render(key, vars) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(template = %key, error = %e, "Template render failed, using raw text");
                source.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use deskpilot_core::types::{CandidateElement, ContextSnapshot};

    fn intent(tag: WorkflowTag, command: &str, context: ContextSnapshot) -> Intent {
        Intent {
            tag,
            raw_command: command.to_string(),
            context,
            extracted_at: Utc::now(),
            context_degraded: false,
            matched_rule: None,
        }
    }

    fn decomposer() -> PlanDecomposer {
        PlanDecomposer::with_defaults().unwrap()
    }

    #[test]
    fn test_every_tag_has_contiguous_ordinals() {
        let decomposer = decomposer();
        for tag in WorkflowTag::ALL {
            let plan = decomposer.decompose(&intent(tag, "do the thing", ContextSnapshot::empty()));
            assert!(!plan.is_empty(), "{}", tag);
            for (index, step) in plan.steps.iter().enumerate() {
                assert_eq!(step.ordinal, index + 1);
            }
            assert!(plan.validate().is_ok());
        }
    }

    #[test]
    fn test_complex_workflow_resolves_entities() {
        let context = ContextSnapshot::new("Desktop").with_candidate(CandidateElement::actor("Alice"));
        let plan = decomposer().decompose(&intent(
            WorkflowTag::ComplexWorkflow,
            "open the messaging app and go to Alice's conversation",
            context,
        ));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].target(), "automation.launch_app");
        assert_eq!(plan.steps[0].params["app"], "Messenger");
        assert_eq!(plan.steps[0].description, "Launch Messenger");
        assert_eq!(plan.steps[1].target(), "automation.navigate_to_user");
        assert_eq!(plan.steps[1].params["user"], "Alice");
    }

    #[test]
    fn test_general_uses_raw_command_as_prompt() {
        let command = "tell me a joke about {{ braces }}";
        let plan = decomposer().decompose(&intent(WorkflowTag::General, command, ContextSnapshot::empty()));

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].module, "ai_inference");
        assert_eq!(plan.steps[0].params["prompt"], command);
    }

    #[test]
    fn test_unresolved_entity_uses_placeholder() {
        let plan = decomposer().decompose(&intent(
            WorkflowTag::FilterAndSummarize,
            "summarize the messages",
            ContextSnapshot::empty(),
        ));
        assert_eq!(plan.steps[0].params["user"], "unknown-user");
        assert_eq!(plan.steps[1].params["prompt"], "Summarize the messages from unknown-user");
    }

    #[test]
    fn test_mailbox_url_is_configurable() {
        let decomposer = decomposer().with_mailbox_url("https://outlook.office.com/mail");
        let plan = decomposer.decompose(&intent(WorkflowTag::OpenMailbox, "open my inbox", ContextSnapshot::empty()));
        assert_eq!(plan.steps[0].params["url"], "https://outlook.office.com/mail");
    }

    #[test]
    fn test_missing_row_gives_empty_plan() {
        let decomposer = PlanDecomposer::new(Vec::new(), EntityCatalog::new()).unwrap();
        let plan = decomposer.decompose(&intent(WorkflowTag::OpenMailbox, "inbox", ContextSnapshot::empty()));
        assert!(plan.is_empty());

        // General is always backfilled.
        let plan = decomposer.decompose(&intent(WorkflowTag::General, "hi", ContextSnapshot::empty()));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_templates_from_yaml() {
        let templates = PlanDecomposer::templates_from_yaml(
            r#"
- tag: open_mailbox
  steps:
    - module: browser
      operation: open_url
      description: "Open {{ mailbox_url }}"
      params:
        url: { text: "{{ mailbox_url }}" }
        new_tab: { value: true }
- tag: launch_application
  steps:
    - module: automation
      operation: launch_app
      params:
        app: { entity: app }
"#,
        )
        .unwrap();

        let decomposer = PlanDecomposer::new(templates, EntityCatalog::builtin()).unwrap();
        let plan = decomposer.decompose(&intent(WorkflowTag::LaunchApplication, "launch slack", ContextSnapshot::empty()));
        assert_eq!(plan.steps[0].params["app"], "Slack");

        let plan = decomposer.decompose(&intent(WorkflowTag::OpenMailbox, "inbox", ContextSnapshot::empty()));
        assert_eq!(plan.steps[0].params["new_tab"], true);
        assert_eq!(plan.steps[0].description, "Open https://mail.google.com");
    }

    #[test]
    fn test_duplicate_rows_rejected() {
        let rows = vec![
            WorkflowTemplate::new(WorkflowTag::General, vec![general_fallback()]),
            WorkflowTemplate::new(WorkflowTag::General, vec![general_fallback()]),
        ];
        assert!(matches!(
            PlanDecomposer::new(rows, EntityCatalog::new()),
            Err(Error::Template(_))
        ));
    }
}
