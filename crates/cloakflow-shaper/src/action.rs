// ============================================
// File: crates/cloakflow-shaper/src/action.rs
// ============================================
//! # Engine Actions
//!
//! ## Creation Reason
//! Defines the decisions the engine emits in response to events, and the
//! pending-set entry the scheduler keeps for each machine.
//!
//! ## Main Functionality
//! - `EngineAction`: one raw decision from the engine (machine, delay, kind)
//! - `ActionKind`: the decision payload; only `InjectPadding` is executed
//! - `PaddingAction`: the dispatched payload
//! - `ScheduledAction`: a pending injection with an absolute fire time
//!
//! ## Forward Compatibility
//! The engine may emit kinds this scheduler does not interpret (today:
//! `BlockOutgoing`). Unknown kinds are logged and discarded by the
//! adapter - this is policy, not an error.
//!
//! ## Last Modified
//! v0.1.0 - Initial action definitions

use std::time::Duration;

use tokio::time::Instant;

use cloakflow_common::types::MachineId;

// ============================================
// PaddingAction
// ============================================

/// A padding transmission to inject on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingAction {
    /// Number of padding bytes to transmit.
    pub byte_count: u16,
    /// Whether the padding may replace a queued real packet instead of
    /// being sent in addition to it.
    pub replace: bool,
}

// ============================================
// ActionKind
// ============================================

/// The payload of an engine decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Inject a padding transmission.
    InjectPadding(PaddingAction),
    /// Block outgoing traffic for a duration. Emitted by some engines;
    /// not interpreted by this scheduler (logged and discarded).
    BlockOutgoing {
        /// How long the engine wants outgoing traffic held.
        duration: Duration,
    },
}

// ============================================
// EngineAction
// ============================================

/// One decision emitted by the engine in response to an event.
///
/// The fire time is relative: "now + delay", where "now" is the single
/// clock read taken when the triggering event was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineAction {
    /// The machine that authored this decision.
    pub machine: MachineId,
    /// Engine-provided delay before the action becomes due.
    pub delay: Duration,
    /// What to do when it becomes due.
    pub kind: ActionKind,
}

impl EngineAction {
    /// Convenience constructor for a padding injection decision.
    #[must_use]
    pub const fn inject_padding(
        machine: MachineId,
        delay: Duration,
        byte_count: u16,
        replace: bool,
    ) -> Self {
        Self {
            machine,
            delay,
            kind: ActionKind::InjectPadding(PaddingAction { byte_count, replace }),
        }
    }
}

// ============================================
// ScheduledAction
// ============================================

/// One entry in the scheduler's pending set: a padding injection with an
/// absolute fire time.
///
/// A machine has at most one of these outstanding; a newer decision for
/// the same machine overwrites the older one, which is discarded without
/// firing.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledAction {
    /// When the action becomes due.
    pub fire_at: Instant,
    /// The payload to dispatch.
    pub padding: PaddingAction,
}

// ============================================
// Tests
// ============================================
