//! Rule-based intent classifier.
//!
//! Rules are evaluated top to bottom and the first match wins, so the order
//! of the table is what disambiguates overlapping keyword sets. The built-in
//! order is:
//!
//! | # | rule | matches when | tag |
//! |---|---|---|---|
//! | 1 | `complex-workflow` | launch verb and navigation phrase | `ComplexWorkflow` |
//! | 2 | `analyze-last-message` | "last", message/chat, "mean" | `AnalyzeLastMessage` |
//! | 3 | `find-and-join-channel` | "channel" and find/join/go to/enter/search | `FindAndJoinChannel` |
//! | 4 | `click-named-button` | "button" and click/press/tap/hit | `ClickTargetControl` |
//! | 5 | `filter-and-summarize` | message and summarize/summary/read through/filter | `FilterAndSummarize` |
//! | 6 | `activate-extension` | "extension" | `ActivateExtension` |
//! | 7 | `open-mailbox` | gmail/mailbox/inbox/email | `OpenMailbox` |
//! | 8 | `launch-application` | open/launch | `LaunchApplication` |
//! | 9 | `click-visible-control` | click/press/tap and a Button on screen | `ClickTargetControl` |
//! | - | fallback | | `General` |

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

use deskpilot_core::{
    types::{Command, ContextSnapshot, ElementKind, Intent, WorkflowTag},
    Error, Result,
};

/// One entry of the rule table.
///
/// The command matches when every keyword group has at least one keyword
/// occurring in it (case-insensitive substring), none of `excludes` occurs,
/// and the context holds a candidate of kind `requires`, if set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub name: String,
    pub tag: WorkflowTag,
    #[serde(default)]
    pub keywords: Vec<Vec<String>>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub requires: Option<ElementKind>,
}

impl ClassificationRule {
    /// Create a rule from keyword groups.
    pub fn new(name: &str, tag: WorkflowTag, groups: &[&[&str]]) -> Self {
        Self {
            name: name.to_string(),
            tag,
            keywords: groups
                .iter()
                .map(|group| group.iter().map(|k| k.to_string()).collect())
                .collect(),
            excludes: Vec::new(),
            requires: None,
        }
    }

    /// Also require a context candidate of this kind.
    pub fn requiring(mut self, kind: ElementKind) -> Self {
        self.requires = Some(kind);
        self
    }

    /// Never match when one of these occurs.
    pub fn excluding(mut self, keywords: &[&str]) -> Self {
        self.excludes = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Lower-case every keyword and reject rules that would match anything.
    fn normalized(mut self) -> Result<Self> {
        if self.keywords.iter().all(Vec::is_empty) && self.requires.is_none() {
            return Err(Error::Classifier(format!("rule '{}' has no conditions", self.name)));
        }
        if self.keywords.iter().any(Vec::is_empty) {
            return Err(Error::Classifier(format!("rule '{}' has an empty keyword group", self.name)));
        }

        for group in &mut self.keywords {
            for keyword in group.iter_mut() {
                *keyword = keyword.to_lowercase();
            }
        }
        for keyword in &mut self.excludes {
            *keyword = keyword.to_lowercase();
        }
        Ok(self)
    }

    /// `text` must already be lower-case.
    fn matches(&self, text: &str, context: &ContextSnapshot) -> bool {
        self.keywords
            .iter()
            .all(|group| group.iter().any(|k| text.contains(k.as_str())))
            && !self.excludes.iter().any(|k| text.contains(k.as_str()))
            && self.requires.map_or(true, |kind| context.has_candidate(kind))
    }
}

/// The built-in rule table, in priority order.
pub fn default_rules() -> Vec<ClassificationRule> {
    const LAUNCH: &[&str] = &["open", "launch", "start"];
    const NAVIGATE: &[&str] = &["go to", "navigate to", "switch to", "chat with"];
    const CLICK: &[&str] = &["click", "press", "tap"];

    vec![
        ClassificationRule::new("complex-workflow", WorkflowTag::ComplexWorkflow, &[LAUNCH, NAVIGATE]),
        ClassificationRule::new(
            "analyze-last-message",
            WorkflowTag::AnalyzeLastMessage,
            &[&["last"], &["message", "chat"], &["mean"]],
        ),
        ClassificationRule::new(
            "find-and-join-channel",
            WorkflowTag::FindAndJoinChannel,
            &[&["channel"], &["find", "join", "go to", "enter", "search"]],
        ),
        ClassificationRule::new(
            "click-named-button",
            WorkflowTag::ClickTargetControl,
            &[&["button"], &["click", "press", "tap", "hit"]],
        ),
        ClassificationRule::new(
            "filter-and-summarize",
            WorkflowTag::FilterAndSummarize,
            &[&["message"], &["summarize", "summarise", "summary", "read through", "filter"]],
        ),
        ClassificationRule::new("activate-extension", WorkflowTag::ActivateExtension, &[&["extension"]]),
        ClassificationRule::new(
            "open-mailbox",
            WorkflowTag::OpenMailbox,
            &[&["gmail", "mailbox", "inbox", "email"]],
        ),
        ClassificationRule::new("launch-application", WorkflowTag::LaunchApplication, &[&["open", "launch"]]),
        ClassificationRule::new("click-visible-control", WorkflowTag::ClickTargetControl, &[CLICK])
            .requiring(ElementKind::Button),
    ]
}

/// Ordered-rule intent classifier.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: Vec<ClassificationRule>,
}

impl RuleClassifier {
    /// Create a classifier from a rule table.
    pub fn new(rules: Vec<ClassificationRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(ClassificationRule::normalized)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Parse a rule table from YAML (a list of rules).
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rules: Vec<ClassificationRule> =
            serde_yaml::from_str(yaml).map_err(|e| Error::Classifier(e.to_string()))?;
        Self::new(rules)
    }

    /// Load a rule table from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Classify a command. Never fails; unmatched commands are `General`.
    ///
    /// A command without context is classified on its text alone and the
    /// intent is flagged `context_degraded`.
    pub fn classify(&self, command: &Command) -> Intent {
        let context_degraded = command.context.is_none();
        let context = command.context.clone().unwrap_or_else(ContextSnapshot::empty);
        let text = command.text.to_lowercase();

        let matched = self.rules.iter().find(|rule| rule.matches(&text, &context));
        let tag = matched.map(|rule| rule.tag).unwrap_or(WorkflowTag::General);

        tracing::debug!(
            workflow = %tag,
            rule = matched.map(|r| r.name.as_str()).unwrap_or("fallback"),
            context_degraded,
            "Command classified"
        );

        Intent {
            tag,
            raw_command: command.text.clone(),
            context,
            extracted_at: Utc::now(),
            context_degraded,
            matched_rule: matched.map(|rule| rule.name.clone()),
        }
    }
}

impl Default for RuleClassifier {
    fn default() -> Self {
        // The built-in rules are non-empty by construction.
        Self {
            rules: default_rules()
                .into_iter()
                .filter_map(|rule| rule.normalized().ok())
                .collect(),
        }
    }
}
