// ============================================
// File: crates/cloakflow-shaper/src/mock.rs
// ============================================
//! # Mock Engine and Sink
//!
//! ## Creation Reason
//! Provides scriptable stand-ins for the decision engine and the action
//! sink so the scheduler can be tested without a real engine or tunnel
//! device.
//!
//! ## Main Functionality
//! - `MockEngine`: scripted per-event responses, records what it saw
//! - `EngineProbe`: inspect a `MockEngine` after it moved into a scheduler
//! - `MockSink`: captures dispatched actions with their dispatch times
//!
//! ## Usage in Tests
//! ```ignore
//! let engine = MockEngine::new()
//!     .on_next_event(vec![EngineAction::inject_padding(
//!         MachineId(0), Duration::from_millis(10), 512, false,
//!     )]);
//! let probe = engine.probe();
//! // ... move the engine into a scheduler, drive it ...
//! assert!(probe.is_stopped());
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - The script is consumed call by call; once exhausted the engine
//!   returns zero actions (a legitimate engine behavior)
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementations

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::action::{EngineAction, PaddingAction};
use crate::error::{Result, ShaperError};
use crate::event::TrafficEvent;
use crate::traits::{ActionSink, EngineFactory, ShapingEngine};

// ============================================
// MockEngine
// ============================================

/// One scripted response of the mock engine.
#[derive(Debug, Clone)]
enum Scripted {
    /// Return these actions.
    Actions(Vec<EngineAction>),
    /// Fail the call.
    Fail,
}

/// State shared between a `MockEngine` and its probes.
#[derive(Debug, Default)]
struct EngineState {
    /// Events the engine has been advanced with.
    seen: Mutex<Vec<TrafficEvent>>,
    /// Whether `stop` was called.
    stopped: AtomicBool,
}

/// Scriptable mock decision engine.
///
/// Responses are scripted in event order with [`on_next_event`](Self::on_next_event)
/// and [`fail_next_event`](Self::fail_next_event); once the script runs
/// out, every further call returns zero actions.
#[derive(Debug, Default)]
pub struct MockEngine {
    script: VecDeque<Scripted>,
    state: Arc<EngineState>,
}

impl MockEngine {
    /// Creates an unscripted engine (always returns zero actions).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response for the next unscripted event.
    #[must_use]
    pub fn on_next_event(mut self, actions: Vec<EngineAction>) -> Self {
        self.script.push_back(Scripted::Actions(actions));
        self
    }

    /// Scripts the next unscripted event to fail.
    #[must_use]
    pub fn fail_next_event(mut self) -> Self {
        self.script.push_back(Scripted::Fail);
        self
    }

    /// Returns a probe for inspecting this engine after it has moved
    /// into a scheduler.
    #[must_use]
    pub fn probe(&self) -> EngineProbe {
        EngineProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl ShapingEngine for MockEngine {
    fn advance(&mut self, event: &TrafficEvent, _now: Instant) -> Result<Vec<EngineAction>> {
        self.state.seen.lock().push(event.clone());
        match self.script.pop_front() {
            Some(Scripted::Actions(actions)) => Ok(actions),
            Some(Scripted::Fail) => Err(ShaperError::engine_call("scripted failure")),
            None => Ok(Vec::new()),
        }
    }

    fn stop(&mut self) {
        self.state.stopped.store(true, Ordering::SeqCst);
    }
}

// ============================================
// EngineProbe
// ============================================

/// Read-only view of a [`MockEngine`]'s observed history.
#[derive(Debug)]
pub struct EngineProbe {
    state: Arc<EngineState>,
}

impl EngineProbe {
    /// Number of events the engine has been advanced with.
    #[must_use]
    pub fn events_seen(&self) -> usize {
        self.state.seen.lock().len()
    }

    /// The events the engine has been advanced with, in order.
    #[must_use]
    pub fn events(&self) -> Vec<TrafficEvent> {
        self.state.seen.lock().clone()
    }

    /// Whether `stop` has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }
}

// ============================================
// MockEngineFactory
// ============================================

/// Factory handing out a single prepared [`MockEngine`], or failing.
///
/// Used by activation tests: the first `build` returns the prepared
/// engine, later builds return fresh unscripted engines.
#[derive(Debug, Default)]
pub struct MockEngineFactory {
    prepared: Mutex<Option<MockEngine>>,
    fail: bool,
}

impl MockEngineFactory {
    /// Factory that builds the given engine on first call.
    #[must_use]
    pub fn with_engine(engine: MockEngine) -> Self {
        Self {
            prepared: Mutex::new(Some(engine)),
            fail: false,
        }
    }

    /// Factory whose every `build` fails (engine init failure).
    #[must_use]
    pub fn failing() -> Self {
        Self {
            prepared: Mutex::new(None),
            fail: true,
        }
    }
}

impl EngineFactory for MockEngineFactory {
    fn build(
        &self,
        _machine_config: &[u8],
        _machine_count: usize,
    ) -> Result<Box<dyn ShapingEngine>> {
        if self.fail {
            return Err(ShaperError::engine_init("scripted factory failure"));
        }
        let engine = self.prepared.lock().take().unwrap_or_default();
        Ok(Box::new(engine))
    }
}

// ============================================
// MockSink
// ============================================

/// State shared between clones of a `MockSink`.
#[derive(Debug, Default)]
struct SinkState {
    /// Successfully dispatched actions with their dispatch instants.
    dispatched: Mutex<Vec<(PaddingAction, Instant)>>,
    /// Number of dispatches that were scripted to fail.
    failed: Mutex<usize>,
    /// Whether dispatches currently fail.
    fail: AtomicBool,
}

/// Capturing mock action sink.
///
/// Clones share state: keep one clone in the test and move the other
/// into the scheduler.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    state: Arc<SinkState>,
}

impl MockSink {
    /// Creates a sink that accepts every dispatch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent dispatches fail (or succeed again).
    pub fn fail_dispatches(&self, fail: bool) {
        self.state.fail.store(fail, Ordering::SeqCst);
    }

    /// Successfully dispatched actions, in dispatch order.
    #[must_use]
    pub fn dispatched(&self) -> Vec<(PaddingAction, Instant)> {
        self.state.dispatched.lock().clone()
    }

    /// Number of dispatches that failed.
    #[must_use]
    pub fn failed_dispatches(&self) -> usize {
        *self.state.failed.lock()
    }
}

#[async_trait]
impl ActionSink for MockSink {
    async fn dispatch(&self, padding: &PaddingAction) -> Result<()> {
        if self.state.fail.load(Ordering::SeqCst) {
            *self.state.failed.lock() += 1;
            return Err(ShaperError::dispatch("scripted sink failure"));
        }
        self.state
            .dispatched
            .lock()
            .push((*padding, Instant::now()));
        Ok(())
    }
}

// ============================================
// Tests
// ============================================
