// ============================================
// File: crates/cloakflow-shaper/src/event.rs
// ============================================
//! # Traffic Events
//!
//! ## Creation Reason
//! Defines the observations the tunnel device reports about real traffic,
//! which drive the decision engine's state and future action production.
//!
//! ## Main Functionality
//! - `TrafficEvent`: one observation on one tunnel connection
//! - `EventKind`: the enumerated (extensible) kinds of observation
//!
//! ## ⚠️ Important Note for Next Developer
//! - Events are immutable and consumed exactly once, in order; the engine
//!   does not tolerate out-of-order delivery
//! - `PaddingSent` carries the machine that authored the padding so the
//!   engine can attribute its own output when it observes it
//!
//! ## Last Modified
//! v0.1.0 - Initial event definitions

use cloakflow_common::types::{MachineId, PeerKey};

// ============================================
// EventKind
// ============================================

/// Kind of traffic observation.
///
/// "NonPadding" is real application traffic; "Padding" is traffic this
/// system injected. The distinction is what lets the engine model cover
/// traffic against real traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Real data was transmitted.
    NonPaddingSent,
    /// Real data was received.
    NonPaddingReceived,
    /// Padding authored by one of our machines was transmitted.
    PaddingSent {
        /// The machine whose action produced this padding.
        machine: MachineId,
    },
    /// Padding was received from the remote side.
    PaddingReceived,
}

// ============================================
// TrafficEvent
// ============================================

/// One observation about traffic on one tunnel connection.
///
/// Produced by the tunnel device; immutable; consumed exactly once by the
/// scheduler that owns the connection's engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficEvent {
    /// Identity of the connection the event was observed on.
    pub peer: PeerKey,
    /// What was observed.
    pub kind: EventKind,
    /// Size of the transmission, in bytes.
    pub xmit_bytes: u16,
}

impl TrafficEvent {
    /// Creates a new traffic event.
    #[must_use]
    pub const fn new(peer: PeerKey, kind: EventKind, xmit_bytes: u16) -> Self {
        Self {
            peer,
            kind,
            xmit_bytes,
        }
    }

    /// Returns `true` if this event reports padding traffic.
    #[must_use]
    pub const fn is_padding(&self) -> bool {
        matches!(
            self.kind,
            EventKind::PaddingSent { .. } | EventKind::PaddingReceived
        )
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_classification() {
        let peer = PeerKey::from_bytes([1; 32]);

        let real = TrafficEvent::new(peer, EventKind::NonPaddingSent, 1380);
        assert!(!real.is_padding());

        let padding = TrafficEvent::new(
            peer,
            EventKind::PaddingSent {
                machine: MachineId(0),
            },
            1380,
        );
        assert!(padding.is_padding());
    }
}
