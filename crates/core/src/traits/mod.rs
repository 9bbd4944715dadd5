//! Core traits for Deskpilot.
//!
//! Traits are organized by the seam they sit on:
//! - `capability`: capability modules and the registry that dispatches to them
//! - `context`: situational context providers
//! - `handler`: the command handling entry point used by transports
//! - `inference`: text inference backends used by the AI capability

pub mod capability;
pub mod context;
pub mod handler;
pub mod inference;

pub use capability::*;
pub use context::*;
pub use handler::*;
pub use inference::*;
