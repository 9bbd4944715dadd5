//! Built-in capability modules and their startup registration.

use std::sync::Arc;

use deskpilot_core::{
    config::AppConfig,
    traits::{CapabilityRegistry, InferenceBackend},
    types::BusyPolicy,
    Result,
};

use crate::automation::AutomationModule;
use crate::browser::BrowserModule;
use crate::inference::{build_backend, AiInferenceModule};
use crate::messaging::{MessagingModule, DEFAULT_CHANNELS};
use crate::registry::DefaultCapabilityRegistry;
use crate::screen::ScreenModule;

/// Order modules are initialized and registered in.
pub const REGISTRATION_ORDER: [&str; 5] = ["screen", "automation", "messaging", "browser", "ai_inference"];

/// Handles to the built-in modules, kept for callers that need typed access
/// (e.g. the screen context provider).
#[derive(Clone)]
pub struct BuiltinModules {
    pub screen: Arc<ScreenModule>,
    pub automation: Arc<AutomationModule>,
    pub messaging: Arc<MessagingModule>,
    pub browser: Arc<BrowserModule>,
    pub ai_inference: Arc<AiInferenceModule>,
}

impl BuiltinModules {
    /// Create the modules with an explicit inference backend.
    pub fn new(busy_policy: BusyPolicy, backend: Arc<dyn InferenceBackend>) -> Self {
        let messaging = DEFAULT_CHANNELS
            .iter()
            .fold(MessagingModule::new(), |module, channel| module.with_channel(channel));

        Self {
            screen: Arc::new(ScreenModule::new()),
            automation: Arc::new(AutomationModule::new(busy_policy)),
            messaging: Arc::new(messaging),
            browser: Arc::new(BrowserModule::new()),
            ai_inference: Arc::new(AiInferenceModule::new(backend)),
        }
    }

    /// Create the modules described by the configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let backend = build_backend(&config.inference)?;
        Ok(Self::new(config.capabilities.busy_policy, backend))
    }

    /// Register every module, in `REGISTRATION_ORDER`.
    pub async fn register_all(&self, registry: &dyn CapabilityRegistry) -> Result<()> {
        registry.register("screen", self.screen.clone()).await?;
        registry.register("automation", self.automation.clone()).await?;
        registry.register("messaging", self.messaging.clone()).await?;
        registry.register("browser", self.browser.clone()).await?;
        registry.register("ai_inference", self.ai_inference.clone()).await?;
        Ok(())
    }
}

/// Build, register and apply `capabilities.disabled` to the built-in modules.
pub async fn register_builtin_modules(
    registry: &DefaultCapabilityRegistry,
    config: &AppConfig,
) -> Result<BuiltinModules> {
    let modules = BuiltinModules::from_config(config)?;
    modules.register_all(registry).await?;

    for name in &config.capabilities.disabled {
        if let Err(e) = registry.mark_unavailable(name, "disabled by configuration") {
            tracing::warn!(module = %name, error = %e, "Cannot disable unknown capability");
        }
    }

    tracing::info!(
        modules = registry.len(),
        disabled = config.capabilities.disabled.len(),
        "Built-in capabilities registered"
    );
    Ok(modules)
}
