// ============================================
// File: crates/cloakflow-tunnel/src/device.rs
// ============================================
//! # Tunnel Device Trait
//!
//! ## Creation Reason
//! Defines the interface of the external tunnel device (handshake,
//! crypto, packet I/O live there - all out of scope here). Cloakflow
//! consumes exactly three capabilities from it: a per-peer traffic event
//! stream, a padding injection operation, and peer lookup.
//!
//! ## Design Philosophy
//! - Trait seam enables mock devices for testing
//! - The event stream terminates by end-of-stream, never by raising an
//!   error into the scheduler
//! - Async-first with `async_trait`; implementations are `Send + Sync`
//!
//! ## ⚠️ Important Note for Next Developer
//! - `shutdown` must close open event streams; that closure is what
//!   drives scheduler teardown (there is no explicit "deactivate")
//! - `inject_padding` may fail while the device is being torn down
//!   concurrently - callers treat that as expected, not as a crash
//!
//! ## Last Modified
//! v0.1.0 - Initial device trait

use async_trait::async_trait;
use tokio::sync::mpsc;

use cloakflow_common::types::PeerKey;
use cloakflow_shaper::action::PaddingAction;
use cloakflow_shaper::event::TrafficEvent;

use crate::error::Result;

// ============================================
// TunnelDevice Trait
// ============================================

/// The external tunnel device, as consumed by Cloakflow.
#[async_trait]
pub trait TunnelDevice: Send + Sync {
    /// Opens the traffic event stream for one peer.
    ///
    /// The returned receiver is the single-consumer end of a
    /// single-producer channel: the device produces, exactly one
    /// scheduler consumes. The stream terminates (the sender side is
    /// dropped) when the device shuts down.
    ///
    /// # Arguments
    /// * `peer` - The connection to observe
    /// * `capacity` - Channel capacity for buffered events
    ///
    /// # Errors
    /// Returns error if the peer is unknown or a stream is already open
    /// for it.
    fn open_event_stream(
        &self,
        peer: &PeerKey,
        capacity: usize,
    ) -> Result<mpsc::Receiver<TrafficEvent>>;

    /// Injects a padding transmission on the peer's connection.
    ///
    /// # Errors
    /// Returns error if the device cannot transmit (e.g. it is shutting
    /// down concurrently). Callers must treat this as recoverable.
    async fn inject_padding(&self, peer: &PeerKey, padding: &PaddingAction) -> Result<()>;

    /// Returns `true` if the device knows this peer.
    fn has_peer(&self, peer: &PeerKey) -> bool;

    /// Shuts the device down, closing all open event streams.
    ///
    /// Closing the streams signals end-of-stream to the schedulers,
    /// which drain and stop. Idempotent.
    async fn shutdown(&self);
}
