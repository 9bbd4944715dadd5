//! Browser capability: tabs and extensions.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use url::Url;

use deskpilot_core::{
    traits::CapabilityModule,
    types::{CapabilityOutput, ParamBag},
    Error, Result,
};

use crate::history::push_bounded;
use crate::params::OpParams;

pub const MODULE_NAME: &str = "browser";

/// Extensions installed in a fresh profile.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "Talend API",
    "AdBlock",
    "LastPass",
    "Postman",
    "React Developer Tools",
    "Vue.js devtools",
];

#[derive(Debug, Default)]
struct BrowserState {
    tabs: Vec<Url>,
    installed: Vec<String>,
    active: Vec<String>,
}

pub struct BrowserModule {
    state: RwLock<BrowserState>,
}

impl BrowserModule {
    /// Create a browser with the default extensions installed.
    pub fn new() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect())
    }

    /// Create a browser with the given extensions installed.
    pub fn with_extensions(installed: Vec<String>) -> Self {
        Self {
            state: RwLock::new(BrowserState {
                installed,
                ..BrowserState::default()
            }),
        }
    }

    /// URLs of open tabs.
    pub async fn open_tabs(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .tabs
            .iter()
            .map(Url::to_string)
            .collect()
    }

    /// Extensions activated so far.
    pub async fn active_extensions(&self) -> Vec<String> {
        self.state.read().await.active.clone()
    }
}

impl Default for BrowserModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilityModule for BrowserModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn description(&self) -> &str {
        "Opens pages and manages browser extensions"
    }

    fn operations(&self) -> Vec<String> {
        vec![
            "open_url".into(),
            "list_extensions".into(),
            "activate_extension".into(),
        ]
    }

    async fn invoke(&self, operation: &str, params: ParamBag) -> Result<CapabilityOutput> {
        let args = OpParams::new(MODULE_NAME, operation, &params);

        match operation {
            "open_url" => {
                let raw = args.required("url")?;
                let url = Url::parse(raw).map_err(|e| {
                    Error::invalid_params(MODULE_NAME, operation, format!("invalid url '{}': {}", raw, e))
                })?;

                let mut state = self.state.write().await;
                push_bounded(&mut state.tabs, url.clone());
                tracing::info!(url = %url, "Opened tab");

                Ok(CapabilityOutput::ok(format!("Opened {}", url))
                    .with_verification(true)
                    .with_field("url", url.to_string()))
            }
            "list_extensions" => {
                let state = self.state.read().await;
                Ok(
                    CapabilityOutput::ok(format!("{} extensions installed", state.installed.len()))
                        .with_field("extensions", json!(state.installed))
                        .with_field("active", json!(state.active)),
                )
            }
            "activate_extension" => {
                let wanted = args.target("extension")?;
                let mut state = self.state.write().await;
                let found = state
                    .installed
                    .iter()
                    .find(|e| e.eq_ignore_ascii_case(wanted))
                    .cloned();

                Ok(match found {
                    Some(name) => {
                        if !state.active.contains(&name) {
                            state.active.push(name.clone());
                        }
                        CapabilityOutput::ok(format!("{} activated", name))
                            .with_verification(true)
                            .with_field("extension", name)
                    }
                    None => {
                        CapabilityOutput::failed(format!("Extension '{}' is not installed", wanted))
                    }
                })
            }
            other => Err(Error::operation_not_found(MODULE_NAME, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_LIMIT;

    fn params(value: serde_json::Value) -> ParamBag {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_open_url_validates() {
        let module = BrowserModule::new();

        let output = module
            .invoke("open_url", params(json!({"url": "https://mail.google.com"})))
            .await
            .unwrap();
        assert_eq!(output.verification, Some(true));
        assert_eq!(module.open_tabs().await, vec!["https://mail.google.com/".to_string()]);

        let err = module
            .invoke("open_url", params(json!({"url": "not a url"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn test_open_tabs_are_bounded() {
        let module = BrowserModule::new();
        for i in 0..HISTORY_LIMIT + 5 {
            module
                .invoke("open_url", params(json!({"url": format!("https://example.com/{}", i)})))
                .await
                .unwrap();
        }

        let tabs = module.open_tabs().await;
        assert_eq!(tabs.len(), HISTORY_LIMIT);
        assert_eq!(tabs[0], "https://example.com/5");
    }

    #[tokio::test]
    async fn test_activate_extension() {
        let module = BrowserModule::new();

        let output = module
            .invoke("activate_extension", params(json!({"extension": "adblock"})))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(module.active_extensions().await, vec!["AdBlock".to_string()]);

        let output = module
            .invoke("activate_extension", params(json!({"extension": "Grammarly"})))
            .await
            .unwrap();
        assert!(!output.success);
    }
}
