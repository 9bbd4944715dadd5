//! Capability registry implementation.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use deskpilot_core::{
    traits::{CapabilityModule, CapabilityRegistry, CapabilityStatus},
    types::{CapabilityOutput, ParamBag},
    Error, Result,
};

/// A registered module and its availability.
struct CapabilityEntry {
    module: Arc<dyn CapabilityModule>,
    /// Reason the module cannot be invoked, if any.
    unavailable: Option<String>,
    /// Registration sequence number.
    order: usize,
}

/// Default capability registry using DashMap.
pub struct DefaultCapabilityRegistry {
    modules: DashMap<String, CapabilityEntry>,
    next_order: AtomicUsize,
}

impl DefaultCapabilityRegistry {
    /// Create a new capability registry.
    pub fn new() -> Self {
        Self {
            modules: DashMap::new(),
            next_order: AtomicUsize::new(0),
        }
    }

    /// Get the number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Whether `invoke` on this module would reach it.
    pub fn is_available(&self, name: &str) -> bool {
        self.modules
            .get(name)
            .map(|entry| entry.unavailable.is_none())
            .unwrap_or(false)
    }

    /// Take a registered module out of service.
    pub fn mark_unavailable(&self, name: &str, reason: impl Into<String>) -> Result<()> {
        let mut entry = self
            .modules
            .get_mut(name)
            .ok_or_else(|| Error::capability_not_found(name))?;
        let reason = reason.into();
        tracing::warn!(module = %name, reason = %reason, "Capability marked unavailable");
        entry.unavailable = Some(reason);
        Ok(())
    }

    fn is_same_module(a: &Arc<dyn CapabilityModule>, b: &Arc<dyn CapabilityModule>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
    }
}

impl Default for DefaultCapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilityRegistry for DefaultCapabilityRegistry {
    async fn register(&self, name: &str, module: Arc<dyn CapabilityModule>) -> Result<()> {
        if let Some(existing) = self.modules.get(name) {
            if Self::is_same_module(&existing.module, &module) {
                tracing::debug!(module = %name, "Capability already registered");
                return Ok(());
            }
            return Err(Error::DuplicateCapability(name.to_string()));
        }

        tracing::info!(module = %name, "Registering capability");

        // Initialization failure is logged and recorded, never propagated.
        let unavailable = match module.initialize().await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(module = %name, error = %e, "Capability failed to initialize");
                Some(e.to_string())
            }
        };

        match self.modules.entry(name.to_string()) {
            Entry::Occupied(existing) => {
                if Self::is_same_module(&existing.get().module, &module) {
                    Ok(())
                } else {
                    Err(Error::DuplicateCapability(name.to_string()))
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(CapabilityEntry {
                    module,
                    unavailable,
                    order: self.next_order.fetch_add(1, Ordering::SeqCst),
                });
                Ok(())
            }
        }
    }

    async fn invoke(
        &self,
        module: &str,
        operation: &str,
        params: ParamBag,
    ) -> Result<CapabilityOutput> {
        let target = {
            let entry = self
                .modules
                .get(module)
                .ok_or_else(|| Error::capability_not_found(module))?;
            if let Some(reason) = &entry.unavailable {
                return Err(Error::unavailable(module, reason.clone()));
            }
            entry.module.clone()
        };

        if !target.operations().iter().any(|op| op == operation) {
            return Err(Error::operation_not_found(module, operation));
        }

        tracing::debug!(module = %module, operation = %operation, "Invoking capability");

        target.invoke(operation, params).await
    }

    fn list_operations(&self) -> BTreeMap<String, Vec<String>> {
        self.modules
            .iter()
            .map(|entry| (entry.key().clone(), entry.module.operations()))
            .collect()
    }

    fn status(&self) -> Vec<CapabilityStatus> {
        let mut entries: Vec<(usize, CapabilityStatus)> = self
            .modules
            .iter()
            .map(|entry| {
                (
                    entry.order,
                    CapabilityStatus {
                        name: entry.key().clone(),
                        available: entry.unavailable.is_none(),
                        reason: entry.unavailable.clone(),
                        operations: entry.module.operations(),
                    },
                )
            })
            .collect();
        entries.sort_by_key(|(order, _)| *order);
        entries.into_iter().map(|(_, status)| status).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_core::mocks::MockCapability;

    #[tokio::test]
    async fn test_register_and_invoke() {
        let registry = DefaultCapabilityRegistry::new();
        let module = Arc::new(MockCapability::new("screen", &["capture"]));
        registry.register("screen", module.clone()).await.unwrap();

        let output = registry
            .invoke("screen", "capture", ParamBag::new())
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(module.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_module_and_operation() {
        let registry = DefaultCapabilityRegistry::new();
        registry
            .register("screen", Arc::new(MockCapability::new("screen", &["capture"])))
            .await
            .unwrap();

        let err = registry
            .invoke("messaging", "join_channel", ParamBag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CapabilityNotFound(_)));

        let err = registry
            .invoke("screen", "zoom", ParamBag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OperationNotFound { .. }));
    }

    #[tokio::test]
    async fn test_register_is_idempotent_for_same_module() {
        let registry = DefaultCapabilityRegistry::new();
        let module: Arc<dyn CapabilityModule> = Arc::new(MockCapability::new("browser", &["open_url"]));

        registry.register("browser", module.clone()).await.unwrap();
        registry.register("browser", module).await.unwrap();
        assert_eq!(registry.len(), 1);

        let other = Arc::new(MockCapability::new("browser", &["open_url"]));
        let err = registry.register("browser", other).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateCapability(_)));
    }

    #[tokio::test]
    async fn test_failed_initialization_marks_unavailable() {
        let registry = DefaultCapabilityRegistry::new();
        let broken = Arc::new(
            MockCapability::new("messaging", &["read_last_message"]).failing_init("app not installed"),
        );

        registry.register("messaging", broken.clone()).await.unwrap();
        registry
            .register("browser", Arc::new(MockCapability::new("browser", &["open_url"])))
            .await
            .unwrap();

        assert!(!registry.is_available("messaging"));
        assert!(registry.is_available("browser"));

        let err = registry
            .invoke("messaging", "read_last_message", ParamBag::new())
            .await
            .unwrap_err();
        match err {
            Error::CapabilityUnavailable { module, reason } => {
                assert_eq!(module, "messaging");
                assert!(reason.contains("app not installed"));
            }
            other => panic!("Expected CapabilityUnavailable, got {:?}", other),
        }
        assert_eq!(broken.call_count(), 0);
    }

    #[tokio::test]
    async fn test_status_in_registration_order() {
        let registry = DefaultCapabilityRegistry::new();
        for name in ["screen", "automation", "messaging", "browser", "ai_inference"] {
            registry
                .register(name, Arc::new(MockCapability::new(name, &["noop"])))
                .await
                .unwrap();
        }
        registry.mark_unavailable("browser", "disabled by configuration").unwrap();

        let status = registry.status();
        let names: Vec<_> = status.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["screen", "automation", "messaging", "browser", "ai_inference"]);
        assert!(!status[3].available);
        assert_eq!(status[3].reason.as_deref(), Some("disabled by configuration"));

        let operations = registry.list_operations();
        assert_eq!(operations["ai_inference"], vec!["noop".to_string()]);
    }
}
