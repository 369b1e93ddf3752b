// ============================================
// File: crates/cloakflow-tunnel/src/tunnel.rs
// ============================================
//! # Tunnel Lifecycle & Shaping Activation
//!
//! ## Creation Reason
//! Ties a tunnel device to at most one shaping session: validates the
//! host-supplied configuration, builds the engine, opens the event
//! stream, and spawns the scheduler. Also owns orderly teardown.
//!
//! ## Main Logical Flow
//! 1. `Tunnel::new` wraps a device; nothing is active yet
//! 2. `activate_shaping` validates config, builds the engine via the
//!    factory, opens the device's event stream, and spawns one scheduler
//! 3. Traffic flows; the scheduler executes the engine's decisions
//! 4. `shutdown` closes the device; the stream closure drains the
//!    scheduler - there is no explicit deactivation call
//!
//! ## Failure Modes
//! - Activation failures (unknown peer, bad config, engine init) are
//!   returned to the caller; no scheduler is ever started
//! - A second activation while one is live is rejected, not replaced
//!
//! ## ⚠️ Important Note for Next Developer
//! - The session lock is held across the whole activation; every step
//!   inside is synchronous, so this cannot deadlock the runtime
//! - `shutdown` takes the handle out of the lock BEFORE awaiting - never
//!   hold a `parking_lot` lock across an await point
//!
//! ## Last Modified
//! v0.1.0 - Initial tunnel lifecycle

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use cloakflow_common::types::PeerKey;
use cloakflow_shaper::adapter::EngineAdapter;
use cloakflow_shaper::scheduler::{ActionScheduler, SchedulerHandle};
use cloakflow_shaper::traits::EngineFactory;

use crate::device::TunnelDevice;
use crate::error::{Result, TunnelError};
use crate::sink::DeviceSink;

// ============================================
// Constants
// ============================================

/// Default capacity of the per-peer event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 2048;

/// Upper bound on the number of machines one session may configure.
pub const MAX_MACHINE_COUNT: usize = 1024;

/// How long teardown waits for the scheduler to drain.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================
// ShapingConfig
// ============================================

/// Configuration for one shaping session.
#[derive(Debug, Clone)]
pub struct ShapingConfig {
    /// The connection to shape.
    pub peer: PeerKey,
    /// Opaque engine configuration (the machine set).
    pub machine_config: Vec<u8>,
    /// Number of machines in the configuration; bounds the actions a
    /// single event may produce.
    pub machine_count: usize,
    /// Capacity of the event channel between device and scheduler.
    pub event_capacity: usize,
}

impl ShapingConfig {
    /// Creates a configuration with the default event capacity.
    #[must_use]
    pub fn new(peer: PeerKey, machine_config: Vec<u8>, machine_count: usize) -> Self {
        Self {
            peer,
            machine_config,
            machine_count,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Overrides the event channel capacity.
    #[must_use]
    pub const fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.machine_count == 0 {
            return Err(TunnelError::invalid_config(
                "machine_count",
                "at least one machine is required",
            ));
        }
        if self.machine_count > MAX_MACHINE_COUNT {
            return Err(TunnelError::invalid_config(
                "machine_count",
                format!("must not exceed {MAX_MACHINE_COUNT}"),
            ));
        }
        if self.event_capacity == 0 {
            return Err(TunnelError::invalid_config(
                "event_capacity",
                "capacity must be at least 1",
            ));
        }
        Ok(())
    }
}

// ============================================
// Tunnel
// ============================================

/// One live tunnel with at most one shaping session.
pub struct Tunnel {
    /// The device this tunnel drives.
    device: Arc<dyn TunnelDevice>,
    /// The active scheduler, if shaping has been activated.
    session: Mutex<Option<SchedulerHandle>>,
}

impl Tunnel {
    /// Wraps a device. Shaping is not active until
    /// [`activate_shaping`](Self::activate_shaping) is called.
    #[must_use]
    pub fn new(device: Arc<dyn TunnelDevice>) -> Self {
        Self {
            device,
            session: Mutex::new(None),
        }
    }

    /// Activates traffic shaping for one peer on this tunnel.
    ///
    /// Builds the engine, opens the device's event stream, and spawns
    /// the scheduler task. Succeeds at most once per tunnel lifetime
    /// (until the previous session has drained).
    ///
    /// # Errors
    /// - `InvalidConfig` if the configuration fails validation
    /// - `AlreadyActive` if a session is live
    /// - `UnknownPeer` if the device does not know the peer
    /// - `Shaper(EngineInit)` if the factory cannot build the engine
    /// - `EventStream` if the device cannot open the stream
    ///
    /// On any error no scheduler is started and no state changes.
    pub fn activate_shaping(
        &self,
        factory: &dyn EngineFactory,
        config: &ShapingConfig,
    ) -> Result<()> {
        config.validate()?;

        // Every step below is synchronous; the lock makes the
        // check-then-activate sequence atomic against concurrent calls.
        let mut session = self.session.lock();
        if session.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(TunnelError::AlreadyActive);
        }

        if !self.device.has_peer(&config.peer) {
            return Err(TunnelError::UnknownPeer);
        }

        let engine = factory.build(&config.machine_config, config.machine_count)?;
        let events = self
            .device
            .open_event_stream(&config.peer, config.event_capacity)?;

        let adapter = EngineAdapter::new(engine, config.machine_count);
        let sink = DeviceSink::new(Arc::clone(&self.device), config.peer);
        let handle = ActionScheduler::new(adapter, events, sink).spawn();
        *session = Some(handle);

        info!(
            machine_count = config.machine_count,
            event_capacity = config.event_capacity,
            "Traffic shaping activated"
        );
        Ok(())
    }

    /// Returns `true` if a shaping session is currently live.
    #[must_use]
    pub fn is_shaping(&self) -> bool {
        self.session.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Tears the tunnel down.
    ///
    /// Shuts the device down (closing the event stream) and waits a
    /// bounded time for the scheduler to drain. Idempotent.
    pub async fn shutdown(&self) {
        // Take the handle out before any await; the lock must not be
        // held across suspension points.
        let handle = self.session.lock().take();

        self.device.shutdown().await;

        if let Some(handle) = handle {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.stopped()).await {
                Ok(true) => debug!("Shaping session drained"),
                Ok(false) => warn!("Scheduler task ended abnormally"),
                Err(_) => warn!(
                    timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                    "Timed out waiting for scheduler drain"
                ),
            }
        }
    }
}

impl std::fmt::Debug for Tunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tunnel")
            .field("shaping", &self.is_shaping())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cloakflow_common::types::MachineId;
    use cloakflow_shaper::action::EngineAction;
    use cloakflow_shaper::event::{EventKind, TrafficEvent};
    use cloakflow_shaper::mock::{MockEngine, MockEngineFactory};

    use super::*;
    use crate::mock::MockTunnelDevice;

    fn peer() -> PeerKey {
        PeerKey::from_bytes([7; 32])
    }

    fn device_with_peer() -> Arc<MockTunnelDevice> {
        let device = Arc::new(MockTunnelDevice::new());
        device.add_peer(peer());
        device
    }

    #[tokio::test]
    async fn test_activation_succeeds_for_known_peer() {
        let device = device_with_peer();
        let tunnel = Tunnel::new(device);
        let factory = MockEngineFactory::default();

        tunnel
            .activate_shaping(&factory, &ShapingConfig::new(peer(), vec![1, 2, 3], 4))
            .unwrap();
        assert!(tunnel.is_shaping());

        tunnel.shutdown().await;
        assert!(!tunnel.is_shaping());
    }

    #[tokio::test]
    async fn test_second_activation_rejected_while_live() {
        let device = device_with_peer();
        let tunnel = Tunnel::new(device);
        let factory = MockEngineFactory::default();
        let config = ShapingConfig::new(peer(), Vec::new(), 1);

        tunnel.activate_shaping(&factory, &config).unwrap();
        assert!(matches!(
            tunnel.activate_shaping(&factory, &config),
            Err(TunnelError::AlreadyActive)
        ));

        tunnel.shutdown().await;
    }

    #[tokio::test]
    async fn test_activation_fails_for_unknown_peer() {
        let tunnel = Tunnel::new(Arc::new(MockTunnelDevice::new()));
        let factory = MockEngineFactory::default();

        let err = tunnel
            .activate_shaping(&factory, &ShapingConfig::new(peer(), Vec::new(), 1))
            .unwrap_err();
        assert!(matches!(err, TunnelError::UnknownPeer));
        assert!(!tunnel.is_shaping());
    }

    #[tokio::test]
    async fn test_engine_init_failure_starts_no_scheduler() {
        let device = device_with_peer();
        let tunnel = Tunnel::new(device.clone());
        let factory = MockEngineFactory::failing();

        let err = tunnel
            .activate_shaping(&factory, &ShapingConfig::new(peer(), Vec::new(), 1))
            .unwrap_err();
        assert!(matches!(err, TunnelError::Shaper(_)));
        assert!(!tunnel.is_shaping());

        // The stream was never opened; a retry with a working factory works.
        tunnel
            .activate_shaping(
                &MockEngineFactory::default(),
                &ShapingConfig::new(peer(), Vec::new(), 1),
            )
            .unwrap();
        tunnel.shutdown().await;
    }

    #[tokio::test]
    async fn test_config_validation() {
        let config = ShapingConfig::new(peer(), Vec::new(), 0);
        assert!(matches!(
            config.validate(),
            Err(TunnelError::InvalidConfig { .. })
        ));

        let config = ShapingConfig::new(peer(), Vec::new(), MAX_MACHINE_COUNT + 1);
        assert!(config.validate().is_err());

        let config = ShapingConfig::new(peer(), Vec::new(), 1).with_event_capacity(0);
        assert!(config.validate().is_err());

        let config = ShapingConfig::new(peer(), Vec::new(), MAX_MACHINE_COUNT);
        config.validate().unwrap();
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_event_to_injection() {
        let device = device_with_peer();
        let tunnel = Tunnel::new(device.clone());

        let engine = MockEngine::new().on_next_event(vec![EngineAction::inject_padding(
            MachineId(0),
            Duration::from_millis(15),
            1024,
            true,
        )]);
        let factory = MockEngineFactory::with_engine(engine);

        tunnel
            .activate_shaping(&factory, &ShapingConfig::new(peer(), Vec::new(), 1))
            .unwrap();

        let event = TrafficEvent::new(peer(), EventKind::NonPaddingSent, 1380);
        assert!(device.emit_event(event).await);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let injected = device.injected();
        assert_eq!(injected.len(), 1);
        assert_eq!(injected[0].0, peer());
        assert_eq!(injected[0].1.byte_count, 1024);
        assert!(injected[0].1.replace);

        tunnel.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_without_dispatching_pending() {
        let device = device_with_peer();
        let tunnel = Tunnel::new(device.clone());

        let engine = MockEngine::new().on_next_event(vec![EngineAction::inject_padding(
            MachineId(0),
            Duration::from_secs(30),
            512,
            false,
        )]);
        let probe = engine.probe();
        let factory = MockEngineFactory::with_engine(engine);

        tunnel
            .activate_shaping(&factory, &ShapingConfig::new(peer(), Vec::new(), 1))
            .unwrap();

        let event = TrafficEvent::new(peer(), EventKind::NonPaddingReceived, 900);
        assert!(device.emit_event(event).await);
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The action is pending 30s out; teardown must discard it.
        tunnel.shutdown().await;
        assert!(probe.is_stopped());
        assert!(device.injected().is_empty());
        assert!(!tunnel.is_shaping());
    }
}
