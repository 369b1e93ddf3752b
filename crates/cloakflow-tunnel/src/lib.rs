// ============================================
// File: crates/cloakflow-tunnel/src/lib.rs
// ============================================
//! # Cloakflow Tunnel - Device Boundary & Lifecycle
//!
//! ## Creation Reason
//! Binds the shaping core to a concrete tunnel device and to the process
//! boundary: the device trait the scheduler consumes, the action sink
//! adapter, the tunnel handle registry, and the activation entry point.
//!
//! ## Main Functionality
//! - [`device`]: `TunnelDevice` - the consumed collaborator interface
//! - [`sink`]: `DeviceSink` - forwards due actions to the device
//! - [`tunnel`]: `Tunnel` + `ShapingConfig` - activation and teardown
//! - [`registry`]: `TunnelRegistry` - opaque handle <-> live tunnel
//! - [`mock`]: `MockTunnelDevice` for tests
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Host / FFI bridge                     │
//! │        (handles, activation calls - out of scope)        │
//! ├──────────────────────────────────────────────────────────┤
//! │   cloakflow-tunnel  ◄── You are here                     │
//! │   TunnelRegistry ─► Tunnel ─► activate / shutdown        │
//! ├──────────────────────────────────────────────────────────┤
//! │   cloakflow-shaper   (scheduler, engine adapter)         │
//! ├──────────────────────────────────────────────────────────┤
//! │   tunnel device      (handshake, crypto, packet I/O -    │
//! │                       external collaborator)             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! 1. Host creates a tunnel, registers it, receives a handle
//! 2. Host activates shaping for a peer on that handle
//! 3. The device feeds events; the scheduler executes padding decisions
//! 4. Tunnel teardown closes the event stream; the scheduler drains and
//!    stops - there is no separate deactivation call
//!
//! ## ⚠️ Important Note for Next Developer
//! - The registry is an owned instance, never a global - pass it to the
//!   boundary functions explicitly
//! - Removal invalidates a handle immediately; concurrent lookups must
//!   see "not found", never a stale tunnel
//!
//! ## Last Modified
//! v0.1.0 - Initial tunnel boundary implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod device;
pub mod error;
pub mod mock;
pub mod registry;
pub mod sink;
pub mod tunnel;

// Re-export primary types
pub use device::TunnelDevice;
pub use error::{Result, TunnelError};
pub use registry::TunnelRegistry;
pub use sink::DeviceSink;
pub use tunnel::{ShapingConfig, Tunnel};
