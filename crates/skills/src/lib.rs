//! Capabilities for Deskpilot.
//!
//! This crate provides:
//! - `DefaultCapabilityRegistry`, the process-wide module registry
//! - Built-in capability modules (screen, automation, messaging, browser, ai_inference)
//! - Inference backends (offline and OpenAI-compatible)
//! - Shared helpers for exclusive resources and parameter validation

pub mod automation;
pub mod browser;
pub mod builtin;
pub mod channel;
pub mod history;
pub mod inference;
pub mod messaging;
pub mod params;
pub mod registry;
pub mod screen;

pub use automation::AutomationModule;
pub use browser::BrowserModule;
pub use builtin::{register_builtin_modules, BuiltinModules, REGISTRATION_ORDER};
pub use channel::ExclusiveChannel;
pub use inference::{build_backend, AiInferenceModule, OfflineBackend, OpenAiBackend};
pub use messaging::{ChatMessage, MessagingModule};
pub use params::OpParams;
pub use registry::DefaultCapabilityRegistry;
pub use screen::{ScreenFrame, ScreenModule};
