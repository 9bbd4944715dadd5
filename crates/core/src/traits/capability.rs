//! Capability module and registry traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{CapabilityOutput, ParamBag};

/// A named unit exposing a fixed set of operations.
///
/// This is the only point of contact between the core and systems outside it
/// (OS automation, cloud services). Implementations must tolerate concurrent
/// `invoke` calls: either serialize internally or fail with `CapabilityBusy`.
#[async_trait]
pub trait CapabilityModule: Send + Sync {
    /// Default registration name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// One-time initialization, called by the registry on registration.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Names of the operations this module exposes.
    fn operations(&self) -> Vec<String>;

    /// Run an operation.
    async fn invoke(&self, operation: &str, params: ParamBag) -> Result<CapabilityOutput>;
}

/// Availability and operations of one registered module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityStatus {
    /// Registration name.
    pub name: String,
    /// Whether `invoke` will reach the module.
    pub available: bool,
    /// Why the module is unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Exposed operations.
    pub operations: Vec<String>,
}

/// Process-lifetime registry of capability modules.
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    /// Bind a name to a module and initialize it.
    ///
    /// Initialization failure does not fail registration; the module is
    /// marked unavailable instead. Fails with `DuplicateCapability` when the
    /// name is bound to a different module.
    async fn register(&self, name: &str, module: Arc<dyn CapabilityModule>) -> Result<()>;

    /// Dispatch an operation to a module, without touching params or result.
    async fn invoke(&self, module: &str, operation: &str, params: ParamBag)
        -> Result<CapabilityOutput>;

    /// Operations per registered module.
    fn list_operations(&self) -> BTreeMap<String, Vec<String>>;

    /// Status of every registered module, in registration order.
    fn status(&self) -> Vec<CapabilityStatus>;
}
