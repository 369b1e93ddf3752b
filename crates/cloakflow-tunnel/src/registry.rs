// ============================================
// File: crates/cloakflow-tunnel/src/registry.rs
// ============================================
//! # Tunnel Handle Registry
//!
//! ## Creation Reason
//! The host refers to live tunnels by small integer handles, never by
//! pointers or peer identities. This registry owns the handle space:
//! allocation, dereference, and invalidation.
//!
//! ## Main Functionality
//! - `insert`: allocates the lowest free handle for a tunnel
//! - `get`: dereferences a handle to its live tunnel
//! - `remove`: invalidates a handle immediately
//! - `remove_and_shutdown`: invalidation plus orderly tunnel teardown
//!
//! ## Design Philosophy
//! - An owned instance, never a global; callers pass it explicitly
//! - Lowest-free-first allocation means handles are small, dense, and
//!   reused after release
//! - `Arc<Tunnel>` out of `get` so callers can operate on the tunnel
//!   after the lock is released
//!
//! ## ⚠️ Important Note for Next Developer
//! - Removal must win races with lookup: after `remove` returns, `get`
//!   on that handle returns `None`, even from other tasks
//! - Allocation is a linear scan; fine at realistic tunnel counts, and
//!   the `with_capacity` bound exists mainly so exhaustion is testable
//!
//! ## Last Modified
//! v0.1.0 - Initial registry implementation

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use cloakflow_common::types::TunnelHandle;

use crate::error::{Result, TunnelError};
use crate::tunnel::Tunnel;

// ============================================
// TunnelRegistry
// ============================================

/// Registry mapping opaque handles to live tunnels.
pub struct TunnelRegistry {
    /// Handle -> live tunnel.
    tunnels: Mutex<HashMap<TunnelHandle, Arc<Tunnel>>>,
    /// Number of handles available (raw values `0..capacity`).
    capacity: i32,
}

impl TunnelRegistry {
    /// Creates a registry spanning the full non-negative handle space.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(i32::MAX)
    }

    /// Creates a registry with a bounded handle space.
    #[must_use]
    pub fn with_capacity(capacity: i32) -> Self {
        Self {
            tunnels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Registers a tunnel and returns its handle.
    ///
    /// The lowest free handle value is allocated; released handles are
    /// reused.
    ///
    /// # Errors
    /// Returns `RegistryFull` when every handle is taken.
    pub fn insert(&self, tunnel: Arc<Tunnel>) -> Result<TunnelHandle> {
        let mut tunnels = self.tunnels.lock();

        let handle = (0..self.capacity)
            .map(TunnelHandle::from)
            .find(|h| !tunnels.contains_key(h))
            .ok_or(TunnelError::RegistryFull)?;

        tunnels.insert(handle, tunnel);
        info!(handle = %handle, total = tunnels.len(), "Tunnel registered");
        Ok(handle)
    }

    /// Dereferences a handle to its live tunnel.
    #[must_use]
    pub fn get(&self, handle: TunnelHandle) -> Option<Arc<Tunnel>> {
        self.tunnels.lock().get(&handle).cloned()
    }

    /// Invalidates a handle, returning the tunnel it referred to.
    ///
    /// After this returns, `get` on the handle yields `None` from every
    /// task. The tunnel itself keeps running until shut down.
    pub fn remove(&self, handle: TunnelHandle) -> Option<Arc<Tunnel>> {
        let removed = self.tunnels.lock().remove(&handle);
        if removed.is_some() {
            debug!(handle = %handle, "Tunnel handle released");
        }
        removed
    }

    /// Invalidates a handle and tears the tunnel down.
    ///
    /// Returns `true` if the handle referred to a live tunnel.
    pub async fn remove_and_shutdown(&self, handle: TunnelHandle) -> bool {
        // Invalidate first so no new operation can reach the tunnel
        // while it drains.
        match self.remove(handle) {
            Some(tunnel) => {
                tunnel.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Number of registered tunnels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tunnels.lock().len()
    }

    /// Returns `true` if no tunnel is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tunnels.lock().is_empty()
    }
}

impl Default for TunnelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TunnelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelRegistry")
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTunnelDevice;

    fn tunnel() -> Arc<Tunnel> {
        Arc::new(Tunnel::new(Arc::new(MockTunnelDevice::new())))
    }

    #[tokio::test]
    async fn test_sequential_allocation_from_zero() {
        let registry = TunnelRegistry::new();
        let a = registry.insert(tunnel()).unwrap();
        let b = registry.insert(tunnel()).unwrap();
        assert_eq!(a.as_raw(), 0);
        assert_eq!(b.as_raw(), 1);
        assert_eq!(registry.count(), 2);
    }

    #[tokio::test]
    async fn test_released_handle_is_reused() {
        let registry = TunnelRegistry::new();
        let a = registry.insert(tunnel()).unwrap();
        let _b = registry.insert(tunnel()).unwrap();

        assert!(registry.remove(a).is_some());
        let c = registry.insert(tunnel()).unwrap();
        assert_eq!(c.as_raw(), 0, "lowest free handle first");
    }

    #[tokio::test]
    async fn test_get_after_remove_is_none() {
        let registry = TunnelRegistry::new();
        let handle = registry.insert(tunnel()).unwrap();

        assert!(registry.get(handle).is_some());
        assert!(registry.remove(handle).is_some());
        assert!(registry.get(handle).is_none());
        assert!(registry.remove(handle).is_none(), "second remove is a no-op");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let registry = TunnelRegistry::with_capacity(2);
        registry.insert(tunnel()).unwrap();
        registry.insert(tunnel()).unwrap();

        assert!(matches!(
            registry.insert(tunnel()),
            Err(TunnelError::RegistryFull)
        ));
    }

    #[tokio::test]
    async fn test_remove_and_shutdown() {
        let registry = TunnelRegistry::new();
        let handle = registry.insert(tunnel()).unwrap();

        assert!(registry.remove_and_shutdown(handle).await);
        assert!(!registry.remove_and_shutdown(handle).await);
        assert!(registry.is_empty());
    }
}
