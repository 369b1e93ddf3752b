// ============================================
// File: crates/cloakflow-tunnel/src/sink.rs
// ============================================
//! # Device Action Sink
//!
//! ## Creation Reason
//! Bridges the scheduling core to the tunnel device: when the scheduler
//! decides an action is due, this adapter performs the network-level side
//! effect by asking the device to transmit a padding packet.
//!
//! ## Design Philosophy
//! - Bound to one peer at construction; the scheduler never names peers
//! - Stateless beyond the binding; cheap to create per session
//! - Device errors are translated, not swallowed - the scheduler decides
//!   how to react (it logs and drops)
//!
//! ## ⚠️ Important Note for Next Developer
//! - Dispatch failures are EXPECTED while the device tears down
//!   concurrently; do not escalate them here
//!
//! ## Last Modified
//! v0.1.0 - Initial sink adapter

use std::sync::Arc;

use async_trait::async_trait;

use cloakflow_common::types::PeerKey;
use cloakflow_shaper::action::PaddingAction;
use cloakflow_shaper::error::{Result, ShaperError};
use cloakflow_shaper::traits::ActionSink;

use crate::device::TunnelDevice;

// ============================================
// DeviceSink
// ============================================

/// Action sink that injects padding on one peer's tunnel connection.
pub struct DeviceSink {
    /// The device to transmit on.
    device: Arc<dyn TunnelDevice>,
    /// The connection all dispatches target.
    peer: PeerKey,
}

impl DeviceSink {
    /// Creates a sink bound to one peer on one device.
    #[must_use]
    pub fn new(device: Arc<dyn TunnelDevice>, peer: PeerKey) -> Self {
        Self { device, peer }
    }
}

#[async_trait]
impl ActionSink for DeviceSink {
    async fn dispatch(&self, padding: &PaddingAction) -> Result<()> {
        self.device
            .inject_padding(&self.peer, padding)
            .await
            .map_err(|e| ShaperError::dispatch(e.to_string()))
    }
}

impl std::fmt::Debug for DeviceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSink")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
