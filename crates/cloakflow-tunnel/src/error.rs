// ============================================
// File: crates/cloakflow-tunnel/src/error.rs
// ============================================
//! # Tunnel Error Types
//!
//! ## Creation Reason
//! Defines the errors surfaced at the tunnel boundary, in particular the
//! fatal-to-activation class that callers of `activate_shaping` see.
//!
//! ## Error Categories
//! 1. **Activation**: unknown peer, invalid configuration, engine init -
//!    activation fails, no scheduler is created, caller is told
//! 2. **Registry**: handle space exhausted
//! 3. **Device**: event stream and injection failures
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never include peer key material in error messages
//! - No error in this crate may terminate the host process
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use cloakflow_common::error::CommonError;
use cloakflow_shaper::error::ShaperError;

/// Result type for tunnel operations.
pub type Result<T> = std::result::Result<T, TunnelError>;

/// Tunnel boundary error types.
#[derive(Error, Debug)]
pub enum TunnelError {
    /// The requested peer is not known to the tunnel device.
    /// Fatal to activation.
    #[error("Peer is not known to the tunnel device")]
    UnknownPeer,

    /// Invalid shaping configuration. Fatal to activation.
    #[error("Invalid shaping configuration: {field} - {reason}")]
    InvalidConfig {
        /// Configuration field at fault
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// A shaping session is already active for this tunnel.
    #[error("Shaping is already active for this tunnel")]
    AlreadyActive,

    /// The handle space is exhausted.
    #[error("Tunnel registry is full")]
    RegistryFull,

    /// Could not open the event stream on the device.
    #[error("Failed to open event stream: {reason}")]
    EventStream {
        /// Why opening failed
        reason: String,
    },

    /// Padding injection failed on the device.
    #[error("Failed to inject padding: {reason}")]
    InjectFailed {
        /// Why injection failed
        reason: String,
    },

    /// Wrapped shaping core error (notably engine init failures).
    #[error(transparent)]
    Shaper(#[from] ShaperError),

    /// Wrapped common error.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TunnelError {
    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `EventStream` error.
    pub fn event_stream(reason: impl Into<String>) -> Self {
        Self::EventStream {
            reason: reason.into(),
        }
    }

    /// Creates an `InjectFailed` error.
    pub fn inject_failed(reason: impl Into<String>) -> Self {
        Self::InjectFailed {
            reason: reason.into(),
        }
    }
}

// ============================================
// Tests
// ============================================
