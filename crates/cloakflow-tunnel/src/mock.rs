// ============================================
// File: crates/cloakflow-tunnel/src/mock.rs
// ============================================
//! # Mock Tunnel Device
//!
//! ## Creation Reason
//! Provides an in-memory tunnel device for testing activation, the sink
//! adapter, and end-to-end scheduler behavior without a real tunnel.
//!
//! ## Main Functionality
//! - Configurable peer set
//! - Per-peer event channels the test can feed
//! - Captured padding injections for verification
//! - Failure injection and shutdown support
//!
//! ## Usage in Tests
//! ```ignore
//! let device = Arc::new(MockTunnelDevice::new());
//! device.add_peer(peer);
//! // ... activate shaping, then:
//! device.emit_event(TrafficEvent::new(peer, EventKind::NonPaddingSent, 1380)).await;
//! assert_eq!(device.injected().len(), 1);
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - `emit_event` delivers on the peer's open stream; events for peers
//!   without a stream are dropped, mirroring a device with no observer
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use cloakflow_common::types::PeerKey;
use cloakflow_shaper::action::PaddingAction;
use cloakflow_shaper::event::TrafficEvent;

use crate::device::TunnelDevice;
use crate::error::{Result, TunnelError};

// ============================================
// MockTunnelDevice
// ============================================

/// Mock tunnel device for testing.
#[derive(Debug, Default)]
pub struct MockTunnelDevice {
    /// Peers the device "knows".
    peers: Mutex<HashSet<PeerKey>>,
    /// Open event streams, one sender per peer.
    streams: Mutex<HashMap<PeerKey, mpsc::Sender<TrafficEvent>>>,
    /// Captured padding injections in dispatch order.
    injected: Mutex<Vec<(PeerKey, PaddingAction)>>,
    /// Whether injections currently fail.
    fail_injections: AtomicBool,
    /// Whether the device has been shut down.
    is_shutdown: AtomicBool,
}

impl MockTunnelDevice {
    /// Creates a device with no peers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the device know a peer.
    pub fn add_peer(&self, peer: PeerKey) {
        self.peers.lock().insert(peer);
    }

    /// Delivers an event on the peer's open stream.
    ///
    /// Returns `false` if no stream is open for the peer (the event is
    /// dropped, as a real device drops unobserved traffic).
    pub async fn emit_event(&self, event: TrafficEvent) -> bool {
        let sender = self.streams.lock().get(&event.peer).cloned();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Captured padding injections, in order.
    #[must_use]
    pub fn injected(&self) -> Vec<(PeerKey, PaddingAction)> {
        self.injected.lock().clone()
    }

    /// Makes subsequent injections fail (or succeed again).
    pub fn fail_injections(&self, fail: bool) {
        self.fail_injections.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TunnelDevice for MockTunnelDevice {
    fn open_event_stream(
        &self,
        peer: &PeerKey,
        capacity: usize,
    ) -> Result<mpsc::Receiver<TrafficEvent>> {
        if !self.has_peer(peer) {
            return Err(TunnelError::UnknownPeer);
        }

        let mut streams = self.streams.lock();
        if streams.contains_key(peer) {
            return Err(TunnelError::event_stream("stream already open for peer"));
        }

        let (tx, rx) = mpsc::channel(capacity);
        streams.insert(*peer, tx);
        Ok(rx)
    }

    async fn inject_padding(&self, peer: &PeerKey, padding: &PaddingAction) -> Result<()> {
        if self.is_shutdown.load(Ordering::SeqCst) || self.fail_injections.load(Ordering::SeqCst)
        {
            return Err(TunnelError::inject_failed("device unavailable"));
        }
        self.injected.lock().push((*peer, *padding));
        Ok(())
    }

    fn has_peer(&self, peer: &PeerKey) -> bool {
        self.peers.lock().contains(peer)
    }

    async fn shutdown(&self) {
        self.is_shutdown.store(true, Ordering::SeqCst);
        // Dropping the senders signals end-of-stream to every consumer.
        self.streams.lock().clear();
    }
}

// ============================================
// Tests
// ============================================
