// ============================================
// File: crates/cloakflow-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Provides foundational error types and result aliases used across all
//! Cloakflow crates, enabling consistent error handling.
//!
//! ## Main Functionality
//! - `CommonError`: Base error enum for common operations
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## Design Philosophy
//! - Use `thiserror` for ergonomic error definitions
//! - Each crate defines its own error type that wraps `CommonError`
//! - Errors should be informative without leaking peer identities
//!
//! ## ⚠️ Important Note for Next Developer
//! - Keep error variants specific but not too granular
//! - Implement `From` traits for seamless error propagation
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Common error types shared across Cloakflow crates.
///
/// # Categories
/// - **Validation**: Input validation failures
/// - **Resource**: Lookup and capacity failures
///
/// # Example
/// ```
/// use cloakflow_common::error::{CommonError, Result};
///
/// fn validate_capacity(machine_count: usize) -> Result<()> {
///     if machine_count == 0 {
///         return Err(CommonError::invalid_input(
///             "machine_count",
///             "must be at least 1",
///         ));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    // ========================================
    // Validation Errors
    // ========================================

    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Data length doesn't match expected size.
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    // ========================================
    // Resource Errors
    // ========================================

    /// Requested resource was not found.
    #[error("Resource not found: {resource_type} with id '{id}'")]
    NotFound {
        /// Type of resource (e.g., "tunnel", "peer")
        resource_type: String,
        /// Identifier that wasn't found
        id: String,
    },

    /// Resource limit exceeded.
    #[error("Resource exhausted: {resource} (limit: {limit})")]
    ResourceExhausted {
        /// Name of the resource
        resource: String,
        /// The limit that was exceeded
        limit: String,
    },

    // ========================================
    // Encoding Errors
    // ========================================

    /// Failed to decode data.
    #[error("Decoding error: {context}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Error details
        details: String,
    },
}

impl CommonError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Creates a `ResourceExhausted` error.
    pub fn resource_exhausted(
        resource: impl Into<String>,
        limit: impl std::fmt::Display,
    ) -> Self {
        Self::ResourceExhausted {
            resource: resource.into(),
            limit: limit.to_string(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error indicates a caller mistake.
    ///
    /// Client errors are caused by invalid input or requests,
    /// not by internal issues.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::InvalidLength { .. }
                | Self::NotFound { .. }
                | Self::Decoding { .. }
        )
    }
}

impl From<base64::DecodeError> for CommonError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decoding {
            context: "base64 decode".into(),
            details: err.to_string(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_input("machine_count", "must be at least 1");
        assert!(err.to_string().contains("machine_count"));
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_error_classification() {
        let client_err = CommonError::invalid_input("field", "bad");
        assert!(client_err.is_client_error());

        let exhausted = CommonError::resource_exhausted("tunnel handles", i32::MAX);
        assert!(!exhausted.is_client_error());
    }

    #[test]
    fn test_base64_error_conversion() {
        use base64::Engine;
        let result = base64::engine::general_purpose::STANDARD.decode("not-base64!");
        let err: CommonError = result.unwrap_err().into();
        assert!(matches!(err, CommonError::Decoding { .. }));
    }
}
