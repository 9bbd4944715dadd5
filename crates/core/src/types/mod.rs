//! Core type definitions for Deskpilot.
//!
//! The data model flows leaf-first: a [`Command`] with an optional
//! [`ContextSnapshot`] is classified into an [`Intent`], decomposed into a
//! [`Plan`] of [`Step`]s, and executed into an [`ExecutionReport`].

pub mod context;
pub mod intent;
pub mod outcome;
pub mod plan;
pub mod policy;
pub mod request;

pub use context::*;
pub use intent::*;
pub use outcome::*;
pub use plan::*;
pub use policy::*;
pub use request::*;
