// ============================================
// File: crates/cloakflow-shaper/src/error.rs
// ============================================
//! # Shaper Error Types
//!
//! ## Creation Reason
//! Defines error types for the scheduling core, separating errors that are
//! fatal to activation from those the scheduler logs and survives.
//!
//! ## Error Categories
//! 1. **Fatal to activation**: engine construction failure - the scheduler
//!    is never started
//! 2. **Per-event recoverable**: a single engine call failing - logged,
//!    no actions produced, loop continues
//! 3. **Per-dispatch recoverable**: sink failure - logged, that action is
//!    dropped, loop continues
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only fatal-to-activation errors are surfaced to callers; the
//!   recoverable classes are observable via logging only
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use cloakflow_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for shaper operations.
pub type Result<T> = std::result::Result<T, ShaperError>;

// ============================================
// ShaperError
// ============================================

/// Shaping core error types.
#[derive(Error, Debug)]
pub enum ShaperError {
    /// Decision engine could not be constructed. Fatal to activation.
    #[error("Failed to initialize decision engine: {reason}")]
    EngineInit {
        /// Why construction failed
        reason: String,
    },

    /// A single engine call failed. Per-event recoverable.
    #[error("Decision engine call failed: {reason}")]
    EngineCall {
        /// Why the call failed
        reason: String,
    },

    /// The engine emitted more actions in one call than the declared
    /// machine capacity allows. This is a defect in the engine, not a
    /// runtime condition to truncate.
    #[error("Engine emitted {produced} actions, capacity is {capacity}")]
    ActionOverflow {
        /// Number of actions the engine produced
        produced: usize,
        /// Declared capacity (number of configured machines)
        capacity: usize,
    },

    /// Dispatching a due action to the sink failed. Per-dispatch
    /// recoverable; expected during concurrent tunnel teardown.
    #[error("Failed to dispatch action: {reason}")]
    Dispatch {
        /// Why dispatch failed
        reason: String,
    },

    /// Wrapped common error.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ShaperError {
    /// Creates an `EngineInit` error.
    pub fn engine_init(reason: impl Into<String>) -> Self {
        Self::EngineInit {
            reason: reason.into(),
        }
    }

    /// Creates an `EngineCall` error.
    pub fn engine_call(reason: impl Into<String>) -> Self {
        Self::EngineCall {
            reason: reason.into(),
        }
    }

    /// Creates a `Dispatch` error.
    pub fn dispatch(reason: impl Into<String>) -> Self {
        Self::Dispatch {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error is fatal to activation.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::EngineInit { .. })
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ShaperError::engine_init("bad config").is_fatal());
        assert!(!ShaperError::engine_call("transient").is_fatal());
        assert!(!ShaperError::dispatch("device gone").is_fatal());
        assert!(!ShaperError::ActionOverflow {
            produced: 3,
            capacity: 2
        }
        .is_fatal());
    }

    #[test]
    fn test_overflow_display() {
        let err = ShaperError::ActionOverflow {
            produced: 5,
            capacity: 4,
        };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('4'));
    }
}
