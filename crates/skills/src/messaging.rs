//! Messaging capability (chat application binding).
//!
//! Keeps an in-process workspace of messages and channels. The unresolved
//! `user` placeholder is accepted by `read_last_message`, where it means
//! "whoever wrote last"; every other operation rejects it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

use deskpilot_core::{
    traits::CapabilityModule,
    types::{CapabilityOutput, ParamBag},
    Error, Result,
};

use crate::params::{is_unresolved, OpParams};

pub const MODULE_NAME: &str = "messaging";

/// Channels present in a fresh workspace.
pub const DEFAULT_CHANNELS: &[&str] = &["aws developers", "aws-cloud-club"];

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
    /// Channel the message was posted in, `None` for direct messages.
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Default)]
struct Workspace {
    /// Messages in arrival order.
    feed: Vec<ChatMessage>,
    channels: Vec<String>,
    joined: Vec<String>,
}

pub struct MessagingModule {
    workspace: RwLock<Workspace>,
}

impl MessagingModule {
    /// Create an empty workspace.
    pub fn new() -> Self {
        Self {
            workspace: RwLock::new(Workspace::default()),
        }
    }

    /// Seed a direct message.
    pub fn with_message(mut self, author: &str, text: &str) -> Self {
        self.workspace.get_mut().feed.push(ChatMessage {
            author: author.to_string(),
            text: text.to_string(),
            channel: None,
        });
        self
    }

    /// Seed a channel the user can search and join.
    pub fn with_channel(mut self, channel: &str) -> Self {
        self.workspace.get_mut().channels.push(channel.to_string());
        self
    }

    /// Channels joined so far.
    pub async fn joined_channels(&self) -> Vec<String> {
        self.workspace.read().await.joined.clone()
    }
}

impl Default for MessagingModule {
    fn default() -> Self {
        Self::new()
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl CapabilityModule for MessagingModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn description(&self) -> &str {
        "Reads conversations, searches and joins channels"
    }

    fn operations(&self) -> Vec<String> {
        vec![
            "read_last_message".into(),
            "search_channels".into(),
            "join_channel".into(),
            "filter_messages_by_user".into(),
        ]
    }

    async fn invoke(&self, operation: &str, params: ParamBag) -> Result<CapabilityOutput> {
        let args = OpParams::new(MODULE_NAME, operation, &params);

        match operation {
            "read_last_message" => {
                let user = args.optional("user").filter(|u| !is_unresolved(u));
                let workspace = self.workspace.read().await;
                let last = workspace
                    .feed
                    .iter()
                    .rev()
                    .find(|m| user.map(|u| same_name(&m.author, u)).unwrap_or(true));

                Ok(match last {
                    Some(message) => CapabilityOutput::ok(format!(
                        "Last message from {}: {}",
                        message.author, message.text
                    ))
                    .with_verification(true)
                    .with_field("author", message.author.clone())
                    .with_field("message", message.text.clone()),
                    None => CapabilityOutput::failed(match user {
                        Some(u) => format!("No messages from {}", u),
                        None => "No messages".to_string(),
                    }),
                })
            }
            "search_channels" => {
                let query = args.target("channel")?.to_lowercase();
                let workspace = self.workspace.read().await;
                let matches: Vec<&String> = workspace
                    .channels
                    .iter()
                    .filter(|c| c.to_lowercase().contains(&query))
                    .collect();

                let output = if matches.is_empty() {
                    CapabilityOutput::failed(format!("No channel matching '{}'", query))
                } else {
                    CapabilityOutput::ok(format!("Found {} channels", matches.len()))
                };
                Ok(output.with_field("matches", json!(matches)))
            }
            "join_channel" => {
                let channel = args.target("channel")?;
                let mut workspace = self.workspace.write().await;
                let found = workspace
                    .channels
                    .iter()
                    .find(|c| same_name(c, channel))
                    .cloned();

                Ok(match found {
                    Some(name) => {
                        if !workspace.joined.contains(&name) {
                            workspace.joined.push(name.clone());
                        }
                        let confirmed = workspace.joined.contains(&name);
                        CapabilityOutput::ok(format!("Joined {}", name))
                            .with_verification(confirmed)
                            .with_field("channel", name)
                    }
                    None => CapabilityOutput::failed(format!("Channel '{}' not found", channel)),
                })
            }
            "filter_messages_by_user" => {
                let user = args.target("user")?;
                let workspace = self.workspace.read().await;
                let messages: Vec<&str> = workspace
                    .feed
                    .iter()
                    .filter(|m| same_name(&m.author, user))
                    .map(|m| m.text.as_str())
                    .collect();

                let output = if messages.is_empty() {
                    CapabilityOutput::failed(format!("No messages from {}", user))
                } else {
                    CapabilityOutput::ok(format!("{} messages from {}", messages.len(), user))
                };
                Ok(output
                    .with_field("count", messages.len())
                    .with_field("messages", json!(messages)))
            }
            other => Err(Error::operation_not_found(MODULE_NAME, other)),
        }
    }
}
