// ============================================
// File: crates/cloakflow-shaper/src/traits.rs
// ============================================
//! # Shaper Traits
//!
//! ## Creation Reason
//! Defines the abstract seams of the scheduling core so the scheduler has
//! no compile-time dependency on the decision engine's internals or on any
//! concrete tunnel device.
//!
//! ## Main Functionality
//! - `ShapingEngine`: capability interface over the opaque decision engine
//! - `EngineFactory`: builds an engine from an opaque configuration blob
//! - `ActionSink`: receives due actions for transmission
//!
//! ## Design Philosophy
//! - Traits enable mock implementations for testing
//! - The engine is synchronous and exclusively owned; the sink is async
//!   and shared
//!
//! ## ⚠️ Important Note for Next Developer
//! - `ShapingEngine` is deliberately NOT `Sync`: exactly one scheduler
//!   task owns it, and `stop` is called once, by that task, on exit
//! - Sink implementations must not block longer than is safe for the
//!   timer accuracy of subsequent actions
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use async_trait::async_trait;
use tokio::time::Instant;

use crate::action::{EngineAction, PaddingAction};
use crate::error::Result;
use crate::event::TrafficEvent;

// ============================================
// ShapingEngine Trait
// ============================================

/// Capability interface over the external decision engine.
///
/// The engine embodies the per-connection obfuscation strategies (the
/// "machines"); this crate treats it as opaque. Internal state advances
/// monotonically in event order - callers must never deliver events out
/// of order.
///
/// # Example
/// ```ignore
/// fn drive(engine: &mut dyn ShapingEngine, event: &TrafficEvent) {
///     let now = Instant::now();
///     match engine.advance(event, now) {
///         Ok(actions) => schedule(actions, now),
///         Err(e) => tracing::warn!("engine call failed: {e}"),
///     }
/// }
/// ```
pub trait ShapingEngine: Send {
    /// Feeds one event to the engine and returns its decisions.
    ///
    /// # Arguments
    /// * `event` - The observation to advance the engine with
    /// * `now` - The single clock read for this event; the engine must use
    ///   it for any internal delay math so that fire times computed from
    ///   the returned delays are consistent
    ///
    /// # Errors
    /// A failed call is per-event recoverable: the caller logs it and
    /// treats it as "no actions produced".
    fn advance(&mut self, event: &TrafficEvent, now: Instant) -> Result<Vec<EngineAction>>;

    /// Instructs the engine to stop. Called exactly once, after the last
    /// `advance`, by the task that owns the engine.
    fn stop(&mut self);
}

// ============================================
// EngineFactory Trait
// ============================================

/// Builds a decision engine from the host-supplied configuration blob.
///
/// The blob format is owned by the engine and treated as opaque bytes
/// here.
pub trait EngineFactory: Send + Sync {
    /// Constructs an engine instance.
    ///
    /// # Arguments
    /// * `machine_config` - Opaque engine configuration
    /// * `machine_count` - Number of configured machines; the engine must
    ///   never emit more than this many actions in a single `advance`
    ///   call (hard precondition, supplied at activation)
    ///
    /// # Errors
    /// Construction failure is fatal to activation; no scheduler is
    /// started.
    fn build(&self, machine_config: &[u8], machine_count: usize)
        -> Result<Box<dyn ShapingEngine>>;
}

// ============================================
// ActionSink Trait
// ============================================

/// Receives a due action and performs the network-level side effect.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; the scheduler task awaits
/// dispatch inline, so implementations must return promptly.
#[async_trait]
pub trait ActionSink: Send + Sync {
    /// Dispatches one due padding action.
    ///
    /// # Errors
    /// Failure is per-dispatch recoverable: the scheduler logs it, drops
    /// the action, and continues. Failures are expected when the
    /// underlying tunnel device is shutting down concurrently.
    async fn dispatch(&self, padding: &PaddingAction) -> Result<()>;
}
