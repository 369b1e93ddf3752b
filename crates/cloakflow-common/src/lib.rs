// ============================================
// File: crates/cloakflow-common/src/lib.rs
// ============================================
//! # Cloakflow Common - Shared Identifiers Library
//!
//! ## Creation Reason
//! Provides the foundational identifier types and error definitions shared
//! across the Cloakflow crates, keeping the shaping core and the tunnel
//! boundary free of duplicated plumbing.
//!
//! ## Main Functionality
//! - [`types`]: Identifier types (`PeerKey`, `MachineId`, `TunnelHandle`)
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              cloakflow-tunnel                       │
//! │                    │                                │
//! │                    ▼                                │
//! │             cloakflow-shaper                        │
//! │                    │                                │
//! │                    ▼                                │
//! │             cloakflow-common  ◄── You are here      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal; no async code belongs here
//! - All public types should implement standard traits (Debug, Clone, etc.)
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use types::{MachineId, PeerKey, TunnelHandle};
