// ============================================
// File: crates/cloakflow-shaper/src/scheduler.rs
// ============================================
//! # Action Scheduler
//!
//! ## Creation Reason
//! The core of Cloakflow: merges an unbounded asynchronous stream of
//! traffic events with a dynamically changing set of future-scheduled
//! actions under a single ordering authority, so that the engine's
//! time-delayed decisions execute at precisely the right moment without
//! blocking event processing and without missing or duplicating timers.
//!
//! ## Main Functionality
//! - `ActionScheduler`: the per-session event/timer merge loop
//! - `SchedulerHandle`: await-able handle for orderly teardown
//!
//! ## State Machine
//! ```text
//! ┌─────────┐  event received   ┌─────────┐
//! │ Running │ ────────────────► │ Running │  (actions merged by machine)
//! └────┬────┘                   └─────────┘
//!      │ timer fires: earliest action dispatched, timer recomputed
//!      │
//!      │ event source closed
//!      ▼
//! ┌─────────┐  engine stopped   ┌─────────┐
//! │Draining │ ────────────────► │ Stopped │  (pending actions discarded)
//! └─────────┘                   └─────────┘
//! ```
//!
//! ## Core Algorithm (each iteration)
//! 1. Linear scan of the pending set for the minimum `(fire_at, machine)`
//!    - the set is bounded by the configured machine count, so a heap
//!    would be overkill
//! 2. If non-empty, a single timer is armed for the earliest fire time;
//!    if empty, no timer exists
//! 3. Block on whichever of {next event, timer expiry} occurs first
//! 4. Timer expiry dispatches exactly the action that armed it; ties on
//!    fire time break by ascending `MachineId` via the scan key
//!
//! ## The Timer/Event Race
//! The central correctness hazard: an event arriving exactly as the timer
//! elapses must never cause a double dispatch or a lost action. Here the
//! race cannot occur by construction: `tokio::select!` polls both futures
//! from ONE task and completes exactly one branch; when the event branch
//! wins, the `sleep_until` future is dropped - a cancelled timer whose
//! wake can no longer be observed. The pending action stays in the set
//! and is re-armed on the next iteration.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The loop owns the pending set; no locking inside, keep it that way
//! - A newer action for the same machine OVERWRITES the older one - the
//!   engine's most recent decision wins, the older never fires
//! - Event-source closure is the ONLY loop exit; it is normal shutdown
//! - Dispatch and engine failures are logged and survived, never fatal
//!
//! ## Last Modified
//! v0.1.0 - Initial scheduler implementation

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

use cloakflow_common::types::MachineId;

use crate::action::ScheduledAction;
use crate::adapter::EngineAdapter;
use crate::event::TrafficEvent;
use crate::traits::ActionSink;

// ============================================
// ActionScheduler
// ============================================

/// The per-session action scheduler.
///
/// Owns the pending set, the engine adapter, the sink, and the event
/// receiver. Runs as one dedicated sequential task per active session;
/// created at activation, destroyed when the event source closes.
pub struct ActionScheduler<S: ActionSink> {
    /// Event in, scheduled actions out.
    adapter: EngineAdapter,
    /// Where due actions go.
    sink: S,
    /// Single-producer event stream from the tunnel device.
    events: mpsc::Receiver<TrafficEvent>,
    /// Machine -> at most one outstanding action.
    pending: HashMap<MachineId, ScheduledAction>,
}

impl<S: ActionSink + 'static> ActionScheduler<S> {
    /// Creates a scheduler. It does nothing until [`spawn`](Self::spawn)ed.
    #[must_use]
    pub fn new(adapter: EngineAdapter, events: mpsc::Receiver<TrafficEvent>, sink: S) -> Self {
        let capacity = adapter.max_actions();
        Self {
            adapter,
            sink,
            events,
            pending: HashMap::with_capacity(capacity),
        }
    }

    /// Spawns the scheduler loop on the current runtime.
    #[must_use]
    pub fn spawn(self) -> SchedulerHandle {
        SchedulerHandle {
            task: tokio::spawn(self.run()),
        }
    }

    /// The merge loop. Exits when the event source closes.
    async fn run(mut self) {
        debug!(capacity = self.adapter.max_actions(), "Action scheduler started");

        loop {
            match self.next_due() {
                Some((machine, fire_at)) => {
                    tokio::select! {
                        // Timer first: when a deadline and an event are
                        // both ready, the due action fires before the
                        // event is processed, preserving fire-time
                        // accuracy. Exactly one branch runs; the loser
                        // future is dropped.
                        biased;
                        () = time::sleep_until(fire_at) => {
                            self.fire(machine).await;
                        }
                        maybe_event = self.events.recv() => {
                            match maybe_event {
                                Some(event) => self.handle_event(&event),
                                None => break,
                            }
                        }
                    }
                }
                // Empty pending set: no timer exists, just wait for events.
                None => match self.events.recv().await {
                    Some(event) => self.handle_event(&event),
                    None => break,
                },
            }
        }

        // Draining: the source is closed; pending actions are discarded
        // silently, never flushed.
        if !self.pending.is_empty() {
            debug!(
                discarded = self.pending.len(),
                "Event source closed; discarding pending actions"
            );
        }
        self.adapter.stop();
        debug!("Action scheduler stopped");
    }

    /// Returns the pending action with the globally earliest fire time.
    ///
    /// Ties on fire time break by ascending machine id (deterministic,
    /// arbitrary but stable).
    fn next_due(&self) -> Option<(MachineId, Instant)> {
        self.pending
            .iter()
            .map(|(machine, action)| (*machine, action.fire_at))
            .min_by_key(|&(machine, fire_at)| (fire_at, machine))
    }

    /// Feeds one event to the engine and merges the resulting actions
    /// into the pending set, each keyed by machine.
    fn handle_event(&mut self, event: &TrafficEvent) {
        for (machine, action) in self.adapter.on_event(event) {
            if self.pending.insert(machine, action).is_some() {
                // Most recent decision wins; the superseded action never fires.
                trace!(machine = %machine, "Pending action superseded");
            }
        }
    }

    /// Dispatches the due action for `machine`, if still pending.
    async fn fire(&mut self, machine: MachineId) {
        let Some(action) = self.pending.remove(&machine) else {
            return;
        };

        trace!(
            machine = %machine,
            byte_count = action.padding.byte_count,
            "Dispatching padding action"
        );

        if let Err(e) = self.sink.dispatch(&action.padding).await {
            // Expected during concurrent tunnel teardown; never stops the loop.
            warn!(machine = %machine, "Failed to dispatch action: {e}");
        }
    }
}

impl<S: ActionSink> std::fmt::Debug for ActionScheduler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionScheduler")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

// ============================================
// SchedulerHandle
// ============================================

/// Handle to a spawned scheduler task.
///
/// Dropping the handle does NOT stop the scheduler; the loop stops when
/// its event source closes. The handle exists so teardown can await the
/// orderly exit.
#[derive(Debug)]
pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Waits for the scheduler loop to exit.
    ///
    /// Returns `false` if the task panicked or was cancelled.
    pub async fn stopped(self) -> bool {
        self.task.await.is_ok()
    }

    /// Returns `true` if the loop has already exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
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
    use crate::mock::{MockEngine, MockSink};

    fn event() -> TrafficEvent {
        TrafficEvent::new(PeerKey::from_bytes([9; 32]), EventKind::NonPaddingSent, 1280)
    }

    fn scheduler_with(
        engine: MockEngine,
        capacity: usize,
    ) -> (mpsc::Sender<TrafficEvent>, MockSink, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(64);
        let sink = MockSink::new();
        let handle =
            ActionScheduler::new(EngineAdapter::new(Box::new(engine), capacity), rx, sink.clone())
                .spawn();
        (tx, sink, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_fires_at_scheduled_time() {
        let engine = MockEngine::new().on_next_event(vec![EngineAction::inject_padding(
            MachineId(0),
            Duration::from_millis(25),
            512,
            false,
        )]);
        let (tx, sink, handle) = scheduler_with(engine, 1);

        let start = Instant::now();
        tx.send(event()).await.unwrap();
        time::sleep(Duration::from_millis(100)).await;

        let dispatched = sink.dispatched();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].0.byte_count, 512);
        let fired_after = dispatched[0].1 - start;
        assert!(fired_after >= Duration::from_millis(25));
        assert!(fired_after < Duration::from_millis(100));

        drop(tx);
        assert!(handle.stopped().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_action_supersedes_older_for_same_machine() {
        // Machine 7 schedules 50ms, then a new event reschedules to 10ms:
        // only the 10ms action fires, at ~10ms, never the original.
        let engine = MockEngine::new()
            .on_next_event(vec![EngineAction::inject_padding(
                MachineId(7),
                Duration::from_millis(50),
                111,
                false,
            )])
            .on_next_event(vec![EngineAction::inject_padding(
                MachineId(7),
                Duration::from_millis(10),
                222,
                false,
            )]);
        let (tx, sink, handle) = scheduler_with(engine, 1);

        let start = Instant::now();
        tx.send(event()).await.unwrap();
        tx.send(event()).await.unwrap();
        time::sleep(Duration::from_millis(200)).await;

        let dispatched = sink.dispatched();
        assert_eq!(dispatched.len(), 1, "superseded action must never fire");
        assert_eq!(dispatched[0].0.byte_count, 222);
        let fired_after = dispatched[0].1 - start;
        assert!(fired_after >= Duration::from_millis(10));
        assert!(fired_after < Duration::from_millis(50));

        drop(tx);
        assert!(handle.stopped().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_fire_times_dispatch_in_machine_order() {
        // Machines 1 and 2 due at the same instant: expected order 1 then 2.
        let engine = MockEngine::new().on_next_event(vec![
            // Insert machine 2 first to prove ordering comes from the
            // tie-break, not from insertion order.
            EngineAction::inject_padding(MachineId(2), Duration::from_millis(5), 200, false),
            EngineAction::inject_padding(MachineId(1), Duration::from_millis(5), 100, false),
        ]);
        let (tx, sink, handle) = scheduler_with(engine, 2);

        tx.send(event()).await.unwrap();
        time::sleep(Duration::from_millis(50)).await;

        let dispatched = sink.dispatched();
        assert_eq!(dispatched.len(), 2);
        assert_eq!(dispatched[0].0.byte_count, 100);
        assert_eq!(dispatched[1].0.byte_count, 200);

        drop(tx);
        assert!(handle.stopped().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_order_is_fire_time_order_not_arrival_order() {
        let engine = MockEngine::new().on_next_event(vec![
            EngineAction::inject_padding(MachineId(1), Duration::from_millis(40), 100, false),
            EngineAction::inject_padding(MachineId(2), Duration::from_millis(10), 200, false),
        ]);
        let (tx, sink, handle) = scheduler_with(engine, 2);

        tx.send(event()).await.unwrap();
        time::sleep(Duration::from_millis(100)).await;

        let dispatched = sink.dispatched();
        assert_eq!(dispatched.len(), 2);
        assert_eq!(dispatched[0].0.byte_count, 200, "earlier fire time first");
        assert_eq!(dispatched[1].0.byte_count, 100);

        drop(tx);
        assert!(handle.stopped().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_dispatch_after_event_source_closes() {
        let engine = MockEngine::new().on_next_event(vec![EngineAction::inject_padding(
            MachineId(3),
            Duration::from_millis(50),
            512,
            false,
        )]);
        let probe = engine.probe();
        let (tx, sink, handle) = scheduler_with(engine, 1);

        tx.send(event()).await.unwrap();
        // Close before the 50ms elapse: the pending action is discarded.
        drop(tx);

        assert!(handle.stopped().await);
        assert!(sink.dispatched().is_empty());
        assert!(probe.is_stopped(), "engine must be told to stop on drain");

        // Even advancing time afterwards produces nothing.
        time::sleep(Duration::from_millis(200)).await;
        assert!(sink.dispatched().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_call_failure_keeps_loop_alive() {
        let engine = MockEngine::new()
            .fail_next_event()
            .on_next_event(vec![EngineAction::inject_padding(
                MachineId(0),
                Duration::from_millis(5),
                64,
                false,
            )]);
        let (tx, sink, handle) = scheduler_with(engine, 1);

        tx.send(event()).await.unwrap(); // fails inside the engine
        tx.send(event()).await.unwrap(); // still processed
        time::sleep(Duration::from_millis(50)).await;

        assert_eq!(sink.dispatched().len(), 1);

        drop(tx);
        assert!(handle.stopped().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_keeps_loop_alive() {
        let engine = MockEngine::new()
            .on_next_event(vec![EngineAction::inject_padding(
                MachineId(0),
                Duration::from_millis(5),
                64,
                false,
            )])
            .on_next_event(vec![EngineAction::inject_padding(
                MachineId(0),
                Duration::from_millis(5),
                65,
                false,
            )]);
        let (tx, sink, handle) = scheduler_with(engine, 1);

        sink.fail_dispatches(true);
        tx.send(event()).await.unwrap();
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.failed_dispatches(), 1);
        assert!(sink.dispatched().is_empty());

        // The loop survived; a later action still goes through.
        sink.fail_dispatches(false);
        tx.send(event()).await.unwrap();
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.dispatched().len(), 1);
        assert_eq!(sink.dispatched()[0].0.byte_count, 65);

        drop(tx);
        assert!(handle.stopped().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_action_event_arms_no_timer() {
        // Unscripted engine: zero actions. Nothing must ever fire.
        let engine = MockEngine::new();
        let probe = engine.probe();
        let (tx, sink, handle) = scheduler_with(engine, 1);

        tx.send(event()).await.unwrap();
        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(probe.events_seen(), 1);
        assert!(sink.dispatched().is_empty());

        drop(tx);
        assert!(handle.stopped().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_arriving_at_deadline_never_double_fires() {
        // An event lands exactly when the timer is due; the action must be
        // dispatched exactly once.
        let engine = MockEngine::new().on_next_event(vec![EngineAction::inject_padding(
            MachineId(0),
            Duration::from_millis(10),
            512,
            false,
        )]);
        let (tx, sink, handle) = scheduler_with(engine, 1);

        tx.send(event()).await.unwrap();
        time::sleep(Duration::from_millis(10)).await;
        tx.send(event()).await.unwrap(); // zero-action event at the deadline
        time::sleep(Duration::from_millis(50)).await;

        assert_eq!(sink.dispatched().len(), 1, "exactly-once dispatch");

        drop(tx);
        assert!(handle.stopped().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_set_tracks_distinct_machines() {
        let engine = MockEngine::new()
            .on_next_event(vec![
                EngineAction::inject_padding(MachineId(1), Duration::from_secs(60), 1, false),
                EngineAction::inject_padding(MachineId(2), Duration::from_secs(60), 2, false),
            ])
            .on_next_event(vec![
                // Machine 2 again (overwrite) plus a new machine 3.
                EngineAction::inject_padding(MachineId(2), Duration::from_secs(60), 22, false),
                EngineAction::inject_padding(MachineId(3), Duration::from_secs(60), 3, false),
            ]);

        let (tx, rx) = mpsc::channel(8);
        let sink = MockSink::new();
        let mut scheduler =
            ActionScheduler::new(EngineAdapter::new(Box::new(engine), 3), rx, sink);

        scheduler.handle_event(&event());
        assert_eq!(scheduler.pending.len(), 2);

        scheduler.handle_event(&event());
        // Three distinct machines with an outstanding action, not four.
        assert_eq!(scheduler.pending.len(), 3);
        assert_eq!(scheduler.pending[&MachineId(2)].padding.byte_count, 22);

        drop(tx);
    }
}
