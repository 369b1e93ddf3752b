// ============================================
// File: crates/cloakflow-shaper/src/lib.rs
// ============================================
//! # Cloakflow Shaper - Action Scheduling Core
//!
//! ## Creation Reason
//! Implements the heart of Cloakflow: a per-connection scheduler that
//! merges a live stream of traffic events with the time-delayed padding
//! decisions of a pluggable obfuscation engine, and executes each decision
//! exactly once at its fire time.
//!
//! ## Main Functionality
//!
//! ### Data Model ([`event`], [`action`])
//! - `TrafficEvent`: one observation of traffic on a tunnel connection
//! - `EngineAction`: one decision emitted by the engine, with a delay
//! - `ScheduledAction`: a pending padding injection with an absolute
//!   fire time
//!
//! ### Seams ([`traits`])
//! - `ShapingEngine`: capability interface over the opaque decision engine
//! - `EngineFactory`: builds an engine from an opaque config blob
//! - `ActionSink`: receives due actions for transmission
//!
//! ### Core ([`adapter`], [`scheduler`])
//! - `EngineAdapter`: events in, scheduled actions out
//! - `ActionScheduler`: the single-task event/timer merge loop
//!
//! ## Data Flow
//! ```text
//! tunnel device ──events──► EngineAdapter ──actions──► pending set
//!                                                          │
//!                                              (single timer fires)
//!                                                          ▼
//! tunnel device ◄──────── ActionSink ◄──────────── ActionScheduler
//! ```
//!
//! ## Scheduling Model
//! One dedicated sequential task per active session. The loop owns the
//! pending set outright, so no locking exists inside it; the event source
//! is a single-producer channel and the only suspension point is
//! "next event OR timer expiry".
//!
//! ## ⚠️ Important Note for Next Developer
//! - The engine is owned by the loop task; never share it across threads
//! - A machine has AT MOST one pending action; newer decisions overwrite
//! - Event-source closure is normal shutdown, not an error
//! - Nothing in this crate may terminate the host process
//!
//! ## Last Modified
//! v0.1.0 - Initial scheduler implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod adapter;
pub mod error;
pub mod event;
pub mod mock;
pub mod scheduler;
pub mod traits;

// Re-export primary types
pub use action::{ActionKind, EngineAction, PaddingAction, ScheduledAction};
pub use adapter::EngineAdapter;
pub use error::{Result, ShaperError};
pub use event::{EventKind, TrafficEvent};
pub use scheduler::{ActionScheduler, SchedulerHandle};
pub use traits::{ActionSink, EngineFactory, ShapingEngine};
