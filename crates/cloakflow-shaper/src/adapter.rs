// ============================================
// File: crates/cloakflow-shaper/src/adapter.rs
// ============================================
//! # Decision Engine Adapter
//!
//! ## Creation Reason
//! Wraps the opaque decision engine: converts inbound traffic events into
//! engine calls and engine output back into scheduled actions the
//! scheduler can merge into its pending set.
//!
//! ## Main Functionality
//! - `EngineAdapter`: event in, zero-or-more `(MachineId, ScheduledAction)`
//!   pairs out
//! - Per-event failure containment (a failed engine call produces no
//!   actions and does not stop the session)
//! - Capacity enforcement (the declared machine count bounds the number of
//!   actions one call may produce)
//!
//! ## Clock Discipline
//! Exactly one clock read per event. The same instant is passed to the
//! engine and used to convert engine delays into absolute fire times, so
//! there is no disparity between the engine's delay math and the schedule.
//!
//! ## ⚠️ Important Note for Next Developer
//! - An engine emitting more than `max_actions` in one call is a DEFECT in
//!   the engine; the whole batch is refused with an error log - never
//!   silently truncated
//! - Unknown action kinds are discarded at debug level; that is forward
//!   compatibility, not an error
//!
//! ## Last Modified
//! v0.1.0 - Initial adapter implementation

use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use cloakflow_common::types::MachineId;

use crate::action::{ActionKind, ScheduledAction};
use crate::event::TrafficEvent;
use crate::traits::ShapingEngine;

// ============================================
// EngineAdapter
// ============================================

/// Adapter between the event stream and the opaque decision engine.
///
/// Owned by exactly one [`ActionScheduler`](crate::scheduler::ActionScheduler);
/// never shared.
pub struct EngineAdapter {
    /// The wrapped engine.
    engine: Box<dyn ShapingEngine>,
    /// Upper bound on actions per engine call (= configured machine count).
    max_actions: usize,
}

impl EngineAdapter {
    /// Creates a new adapter.
    ///
    /// # Arguments
    /// * `engine` - The engine instance, exclusively owned from here on
    /// * `max_actions` - Declared machine count; hard bound on the number
    ///   of actions a single event may produce
    #[must_use]
    pub fn new(engine: Box<dyn ShapingEngine>, max_actions: usize) -> Self {
        Self {
            engine,
            max_actions,
        }
    }

    /// Returns the declared per-call action capacity.
    #[must_use]
    pub const fn max_actions(&self) -> usize {
        self.max_actions
    }

    /// Feeds one event to the engine and converts its decisions into
    /// scheduled actions.
    ///
    /// Reads the clock once; the same instant drives the engine call and
    /// the `fire_at = now + delay` computation.
    ///
    /// Never fails: engine-call errors and capacity violations are logged
    /// and yield an empty batch (per-event recoverable semantics).
    pub fn on_event(&mut self, event: &TrafficEvent) -> Vec<(MachineId, ScheduledAction)> {
        let now = Instant::now();

        let actions = match self.engine.advance(event, now) {
            Ok(actions) => actions,
            Err(e) => {
                warn!(kind = ?event.kind, "Engine call failed, no actions produced: {e}");
                return Vec::new();
            }
        };

        if actions.len() > self.max_actions {
            // Engine defect: the capacity is a precondition agreed at
            // activation, not a limit to clamp to at runtime.
            error!(
                produced = actions.len(),
                capacity = self.max_actions,
                "Engine exceeded its declared action capacity; batch refused"
            );
            return Vec::new();
        }

        actions
            .into_iter()
            .filter_map(|action| match action.kind {
                ActionKind::InjectPadding(padding) => {
                    trace!(
                        machine = %action.machine,
                        delay_us = action.delay.as_micros() as u64,
                        byte_count = padding.byte_count,
                        replace = padding.replace,
                        "Scheduling padding injection"
                    );
                    Some((
                        action.machine,
                        ScheduledAction {
                            fire_at: now + action.delay,
                            padding,
                        },
                    ))
                }
                other => {
                    debug!(machine = %action.machine, kind = ?other, "Discarding uninterpreted action kind");
                    None
                }
            })
            .collect()
    }

    /// Instructs the engine to stop. Forwarded exactly once by the
    /// scheduler when its loop exits.
    pub fn stop(&mut self) {
        self.engine.stop();
    }
}

impl std::fmt::Debug for EngineAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineAdapter")
            .field("max_actions", &self.max_actions)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cloakflow_common::types::PeerKey;

    use super::*;
    use crate::action::EngineAction;
    use crate::event::EventKind;
    use crate::mock::MockEngine;

    fn test_event() -> TrafficEvent {
        TrafficEvent::new(PeerKey::from_bytes([7; 32]), EventKind::NonPaddingSent, 1380)
    }

    #[tokio::test]
    async fn test_zero_actions_yields_empty_batch() {
        // Unscripted engine returns no actions
        let mut adapter = EngineAdapter::new(Box::new(MockEngine::new()), 4);

        let batch = adapter.on_event(&test_event());
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_padding_actions_get_absolute_fire_times() {
        let engine = MockEngine::new().on_next_event(vec![
            EngineAction::inject_padding(MachineId(1), Duration::from_millis(10), 100, false),
            EngineAction::inject_padding(MachineId(2), Duration::from_millis(50), 200, true),
        ]);
        let mut adapter = EngineAdapter::new(Box::new(engine), 4);

        let before = Instant::now();
        let batch = adapter.on_event(&test_event());

        assert_eq!(batch.len(), 2);
        let (machine, scheduled) = batch[0];
        assert_eq!(machine, MachineId(1));
        assert_eq!(scheduled.padding.byte_count, 100);
        assert!(scheduled.fire_at >= before + Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_engine_failure_is_recoverable() {
        let engine = MockEngine::new().fail_next_event().on_next_event(vec![
            EngineAction::inject_padding(MachineId(1), Duration::ZERO, 100, false),
        ]);
        let mut adapter = EngineAdapter::new(Box::new(engine), 4);

        // Failed call: empty batch, adapter still usable
        assert!(adapter.on_event(&test_event()).is_empty());
        // Next call succeeds
        assert_eq!(adapter.on_event(&test_event()).len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_violation_refuses_whole_batch() {
        let engine = MockEngine::new().on_next_event(vec![
            EngineAction::inject_padding(MachineId(1), Duration::ZERO, 100, false),
            EngineAction::inject_padding(MachineId(2), Duration::ZERO, 200, false),
        ]);
        // Capacity of one machine, engine emitted two: defect, nothing kept
        let mut adapter = EngineAdapter::new(Box::new(engine), 1);

        assert!(adapter.on_event(&test_event()).is_empty());
    }

    #[tokio::test]
    async fn test_uninterpreted_kind_is_discarded() {
        let engine = MockEngine::new().on_next_event(vec![
            EngineAction {
                machine: MachineId(1),
                delay: Duration::ZERO,
                kind: ActionKind::BlockOutgoing {
                    duration: Duration::from_secs(1),
                },
            },
            EngineAction::inject_padding(MachineId(2), Duration::ZERO, 64, false),
        ]);
        let mut adapter = EngineAdapter::new(Box::new(engine), 4);

        let batch = adapter.on_event(&test_event());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].0, MachineId(2));
    }

    #[tokio::test]
    async fn test_stop_reaches_engine() {
        let engine = MockEngine::new();
        let probe = engine.probe();
        let mut adapter = EngineAdapter::new(Box::new(engine), 1);

        adapter.stop();
        assert!(probe.is_stopped());
    }
}
