//! Exclusive access to a shared external resource.

use tokio::sync::{Mutex, MutexGuard};

use deskpilot_core::{types::BusyPolicy, Error, Result};

/// A single resource (e.g. one OS automation session) shared by all requests.
///
/// Under `BusyPolicy::Wait` callers queue; under `BusyPolicy::Reject` a caller
/// that finds the resource held fails with `CapabilityBusy`.
pub struct ExclusiveChannel<T> {
    owner: String,
    inner: Mutex<T>,
    policy: BusyPolicy,
}

impl<T> ExclusiveChannel<T> {
    /// Create a new channel owned by the named module.
    pub fn new(owner: impl Into<String>, resource: T, policy: BusyPolicy) -> Self {
        Self {
            owner: owner.into(),
            inner: Mutex::new(resource),
            policy,
        }
    }

    /// Acquire the resource according to the busy policy.
    pub async fn acquire(&self) -> Result<MutexGuard<'_, T>> {
        match self.policy {
            BusyPolicy::Wait => Ok(self.inner.lock().await),
            BusyPolicy::Reject => self.inner.try_lock().map_err(|_| {
                tracing::debug!(module = %self.owner, "Shared channel busy, rejecting caller");
                Error::CapabilityBusy(self.owner.clone())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reject_while_held() {
        let channel = ExclusiveChannel::new("automation", 0u32, BusyPolicy::Reject);
        let guard = channel.acquire().await.unwrap();

        let err = channel.acquire().await.unwrap_err();
        assert!(matches!(err, Error::CapabilityBusy(ref owner) if owner == "automation"));

        drop(guard);
        assert!(channel.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_serializes() {
        let channel = std::sync::Arc::new(ExclusiveChannel::new("automation", Vec::new(), BusyPolicy::Wait));

        let mut handles = Vec::new();
        for i in 0..4 {
            let channel = channel.clone();
            handles.push(tokio::spawn(async move {
                let mut log = channel.acquire().await.unwrap();
                log.push(i);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(channel.acquire().await.unwrap().len(), 4);
    }
}
