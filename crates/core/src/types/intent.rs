use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::context::ContextSnapshot;

// =============================================================================
// Command & Intent Types (classifier input/output)
// =============================================================================

/// Closed set of workflow types a command can be classified into.
///
/// `General` is the universal fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowTag {
    /// Launch an application, then act inside it.
    ComplexWorkflow,
    /// Read the latest message and explain it.
    AnalyzeLastMessage,
    /// Search for a channel, then join it.
    FindAndJoinChannel,
    /// Locate a control on screen and click it.
    ClickTargetControl,
    /// Filter messages by author and summarise them.
    FilterAndSummarize,
    /// Find a browser extension and activate it.
    ActivateExtension,
    /// Open the configured mailbox.
    OpenMailbox,
    /// Launch a single application.
    LaunchApplication,
    /// Fallback: hand the command to the inference module.
    General,
}

impl WorkflowTag {
    /// Every tag, in declaration order.
    pub const ALL: [WorkflowTag; 9] = [
        WorkflowTag::ComplexWorkflow,
        WorkflowTag::AnalyzeLastMessage,
        WorkflowTag::FindAndJoinChannel,
        WorkflowTag::ClickTargetControl,
        WorkflowTag::FilterAndSummarize,
        WorkflowTag::ActivateExtension,
        WorkflowTag::OpenMailbox,
        WorkflowTag::LaunchApplication,
        WorkflowTag::General,
    ];

    /// Snake-case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComplexWorkflow => "complex_workflow",
            Self::AnalyzeLastMessage => "analyze_last_message",
            Self::FindAndJoinChannel => "find_and_join_channel",
            Self::ClickTargetControl => "click_target_control",
            Self::FilterAndSummarize => "filter_and_summarize",
            Self::ActivateExtension => "activate_extension",
            Self::OpenMailbox => "open_mailbox",
            Self::LaunchApplication => "launch_application",
            Self::General => "general",
        }
    }
}

impl fmt::Display for WorkflowTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw command as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Free-text command.
    pub text: String,
    /// Situational context, if one could be acquired.
    pub context: Option<ContextSnapshot>,
}

impl Command {
    /// Create a command without context.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
        }
    }

    /// Attach a context snapshot.
    pub fn with_context(mut self, context: ContextSnapshot) -> Self {
        self.context = Some(context);
        self
    }
}

/// Classified intent of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Workflow type.
    #[serde(rename = "type")]
    pub tag: WorkflowTag,
    /// The command text exactly as received.
    pub raw_command: String,
    /// Context used for classification (empty when degraded).
    pub context: ContextSnapshot,
    /// Classification time.
    pub extracted_at: DateTime<Utc>,
    /// Set when context acquisition failed and classification used text only.
    #[serde(default)]
    pub context_degraded: bool,
    /// Name of the rule that matched, `None` for the fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
}
