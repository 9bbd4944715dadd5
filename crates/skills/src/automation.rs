//! Desktop automation capability.
//!
//! Wraps the single OS automation channel every request shares. Keystrokes and
//! clicks are simulated: the module keeps a model of the desktop session and
//! reports what it would have done.

use async_trait::async_trait;
use std::time::Duration;

use deskpilot_core::{
    traits::CapabilityModule,
    types::{BusyPolicy, CapabilityOutput, ParamBag},
    Error, Result,
};

use crate::channel::ExclusiveChannel;
use crate::history::push_bounded;
use crate::params::OpParams;

pub const MODULE_NAME: &str = "automation";

/// Simulated desktop session behind the automation channel.
#[derive(Debug, Default, Clone)]
pub struct DesktopSession {
    /// Applications launched during the session, in launch order.
    pub launched: Vec<String>,
    /// Frontmost application.
    pub foreground: Option<String>,
    /// User the foreground application is showing.
    pub open_conversation: Option<String>,
    /// Most recent controls clicked, oldest first.
    pub clicked: Vec<String>,
    /// Most recent text typed, oldest first.
    pub typed: Vec<String>,
}

/// Automation capability module.
pub struct AutomationModule {
    channel: ExclusiveChannel<DesktopSession>,
    /// Time each action holds the channel.
    action_latency: Duration,
}

impl AutomationModule {
    /// Create a new automation module.
    pub fn new(policy: BusyPolicy) -> Self {
        Self {
            channel: ExclusiveChannel::new(MODULE_NAME, DesktopSession::default(), policy),
            action_latency: Duration::ZERO,
        }
    }

    /// Hold the channel for this long on every action.
    pub fn with_action_latency(mut self, latency: Duration) -> Self {
        self.action_latency = latency;
        self
    }

    /// Copy of the current session state.
    pub async fn session(&self) -> Result<DesktopSession> {
        Ok(self.channel.acquire().await?.clone())
    }

    async fn settle(&self) {
        if !self.action_latency.is_zero() {
            tokio::time::sleep(self.action_latency).await;
        }
    }
}

#[async_trait]
impl CapabilityModule for AutomationModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn description(&self) -> &str {
        "Launches applications and drives them with clicks and keystrokes"
    }

    fn operations(&self) -> Vec<String> {
        vec![
            "launch_app".into(),
            "navigate_to_user".into(),
            "find_and_click".into(),
            "type_text".into(),
        ]
    }

    async fn invoke(&self, operation: &str, params: ParamBag) -> Result<CapabilityOutput> {
        let args = OpParams::new(MODULE_NAME, operation, &params);

        match operation {
            "launch_app" => {
                let app = args.target("app")?;
                let mut session = self.channel.acquire().await?;
                self.settle().await;

                if !session.launched.iter().any(|a| a == app) {
                    session.launched.push(app.to_string());
                }
                session.foreground = Some(app.to_string());
                session.open_conversation = None;

                tracing::info!(app = %app, "Application launched");
                Ok(CapabilityOutput::ok(format!("{} launched", app))
                    .with_verification(true)
                    .with_field("app", app))
            }
            "navigate_to_user" => {
                let user = args.target("user")?;
                let mut session = self.channel.acquire().await?;
                self.settle().await;

                // Navigation can only be confirmed inside a running application.
                let confirmed = session.foreground.is_some();
                if confirmed {
                    session.open_conversation = Some(user.to_string());
                }

                Ok(CapabilityOutput::ok(format!("Navigated to {}", user))
                    .with_verification(confirmed)
                    .with_field("user", user)
                    .with_field("app", session.foreground.clone().unwrap_or_default()))
            }
            "find_and_click" => {
                let target = args.target("target")?;
                let mut session = self.channel.acquire().await?;
                self.settle().await;

                push_bounded(&mut session.clicked, target.to_string());
                Ok(CapabilityOutput::ok(format!("Clicked '{}'", target)).with_field("target", target))
            }
            "type_text" => {
                let text = args.required("text")?;
                let mut session = self.channel.acquire().await?;
                self.settle().await;

                push_bounded(&mut session.typed, text.to_string());
                Ok(CapabilityOutput::ok(format!("Typed {} characters", text.chars().count())))
            }
            other => Err(Error::operation_not_found(MODULE_NAME, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::history::HISTORY_LIMIT;

    fn params(value: serde_json::Value) -> ParamBag {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_navigation_verified_only_after_launch() {
        let module = AutomationModule::new(BusyPolicy::Wait);

        let output = module
            .invoke("navigate_to_user", params(json!({"user": "Alice"})))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.verification, Some(false));

        module
            .invoke("launch_app", params(json!({"app": "Messenger"})))
            .await
            .unwrap();
        let output = module
            .invoke("navigate_to_user", params(json!({"user": "Alice"})))
            .await
            .unwrap();
        assert_eq!(output.verification, Some(true));

        let session = module.session().await.unwrap();
        assert_eq!(session.foreground.as_deref(), Some("Messenger"));
        assert_eq!(session.open_conversation.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_placeholder_target_rejected() {
        let module = AutomationModule::new(BusyPolicy::Wait);
        let err = module
            .invoke("find_and_click", params(json!({"target": "unknown-control"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reject_policy_reports_busy() {
        let module = AutomationModule::new(BusyPolicy::Reject)
            .with_action_latency(Duration::from_millis(200));

        let (first, second) = tokio::join!(
            module.invoke("launch_app", params(json!({"app": "Slack"}))),
            module.invoke("type_text", params(json!({"text": "hello"}))),
        );

        assert!(first.unwrap().success);
        assert!(matches!(second.unwrap_err(), Error::CapabilityBusy(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_policy_serializes() {
        let module = AutomationModule::new(BusyPolicy::Wait)
            .with_action_latency(Duration::from_millis(200));

        let (first, second) = tokio::join!(
            module.invoke("launch_app", params(json!({"app": "Slack"}))),
            module.invoke("type_text", params(json!({"text": "hello"}))),
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(module.session().await.unwrap().typed, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_click_log_is_bounded() {
        let module = AutomationModule::new(BusyPolicy::Wait);
        for i in 0..HISTORY_LIMIT + 3 {
            module
                .invoke("find_and_click", params(json!({"target": format!("Button {}", i)})))
                .await
                .unwrap();
        }

        let session = module.session().await.unwrap();
        assert_eq!(session.clicked.len(), HISTORY_LIMIT);
        assert_eq!(session.clicked[0], "Button 3");
    }
}
