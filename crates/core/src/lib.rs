//! Core types, traits, and error definitions for Deskpilot.
//!
//! This crate provides the building blocks shared by every layer: the
//! command/intent/plan/report data model, the capability and context
//! provider contracts, configuration loading, and reusable test mocks.

pub mod config;
pub mod error;
pub mod mocks;
pub mod template;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{
    CapabilityModule, CapabilityRegistry, CapabilityStatus, CommandHandler, ContextProvider,
    InferenceBackend,
};
pub use types::*;
