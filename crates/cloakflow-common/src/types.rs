// ============================================
// File: crates/cloakflow-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifier types used throughout Cloakflow, ensuring
//! type safety and consistent representations at the process boundary.
//!
//! ## Main Functionality
//! - `PeerKey`: Public identity of one tunnel connection (32 bytes)
//! - `MachineId`: Opaque numeric key for one obfuscation machine
//! - `TunnelHandle`: Small non-negative integer handle for the host
//!
//! ## Main Logical Flow
//! 1. `PeerKey` arrives from the host as a base64 string at activation
//! 2. `MachineId` keys the scheduler's pending set and breaks timer ties
//! 3. `TunnelHandle` is allocated by the registry and dereferenced on
//!    every boundary call
//!
//! ## ⚠️ Important Note for Next Developer
//! - `PeerKey` is a PUBLIC key - it is not secret material and must not
//!   be treated as such (no zeroization needed)
//! - `MachineId` ordering is load-bearing: the scheduler breaks equal
//!   fire times by ascending `MachineId`
//! - Maintain backward-compatible serialization formats
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Size of a peer public key in bytes.
pub const PEER_KEY_SIZE: usize = 32;

// ============================================
// PeerKey
// ============================================

/// Public identity of one tunnel connection.
///
/// # Wire Format
/// The external tunnel identifies peers by a 32-byte public key. At the
/// process boundary the key travels as a base64 string; internally it is
/// a fixed array usable as a map key.
///
/// # Example
/// ```
/// use cloakflow_common::types::PeerKey;
///
/// let key = PeerKey::from_bytes([0x42; 32]);
/// let encoded = key.to_string();
/// let decoded: PeerKey = encoded.parse().unwrap();
/// assert_eq!(key, decoded);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerKey([u8; PEER_KEY_SIZE]);

impl PeerKey {
    /// Creates a `PeerKey` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; PEER_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parses a `PeerKey` from a byte slice.
    ///
    /// # Errors
    /// Returns `InvalidLength` if the slice is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CommonError> {
        let array: [u8; PEER_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CommonError::invalid_length(PEER_KEY_SIZE, bytes.len()))?;
        Ok(Self(array))
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PEER_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64.encode(self.0))
    }
}

impl FromStr for PeerKey {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64.decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for PeerKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PeerKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// MachineId
// ============================================

/// Opaque numeric key identifying one running obfuscation machine.
///
/// Multiple machines may be active concurrently per tunnel. The id is
/// assigned by the decision engine and is meaningful only within one
/// scheduler session.
///
/// # Ordering
/// `MachineId` is totally ordered; the scheduler uses ascending id order
/// as the deterministic tie-break between actions with equal fire times.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MachineId(pub u32);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "machine#{}", self.0)
    }
}

impl From<u32> for MachineId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

// ============================================
// TunnelHandle
// ============================================

/// Small non-negative integer handle identifying a live tunnel at the
/// process boundary.
///
/// Handles are allocated by the registry (lowest free value first) and
/// become invalid the moment the tunnel is removed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TunnelHandle(i32);

impl TunnelHandle {
    /// Creates a handle from a raw value received at the boundary.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the value is negative.
    pub fn from_raw(raw: i32) -> Result<Self, CommonError> {
        if raw < 0 {
            return Err(CommonError::invalid_input(
                "tunnel_handle",
                "handle must be non-negative",
            ));
        }
        Ok(Self(raw))
    }

    /// Creates a handle without validation. For registry-internal use.
    #[must_use]
    pub(crate) const fn new_unchecked(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_raw(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for TunnelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tunnel#{}", self.0)
    }
}

// Registry allocation lives in cloakflow-tunnel; it needs to mint handles.
impl From<i32> for TunnelHandle {
    fn from(raw: i32) -> Self {
        debug_assert!(raw >= 0, "tunnel handles are non-negative");
        Self::new_unchecked(raw)
    }
}

// ============================================
// Tests
// ============================================
