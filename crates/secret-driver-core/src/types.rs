//! Strong type definitions for the secret driver.
//!
//! Principals and access modes are newtypes/enums so that a raw uid or a raw
//! open-flags word can never be confused with one another.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AccessError;

/// Default capacity of the secret buffer, in bytes.
pub const SECRET_CAPACITY: usize = 8192;

/// Open flag requesting write-only access.
pub const O_WRONLY: u32 = 2;

/// Open flag requesting read-only access.
pub const O_RDONLY: u32 = 4;

/// Open flag requesting read-write access (always rejected).
pub const O_RDWR: u32 = 6;

/// The identity of a caller, as resolved by the host from its credentials.
///
/// This is the host's numeric user id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(pub u32);

impl Principal {
    /// Create a principal from a raw uid.
    pub const fn new(uid: u32) -> Self {
        Self(uid)
    }

    /// Get the raw uid.
    pub const fn uid(&self) -> u32 {
        self.0
    }

    /// Encode as the 4-byte payload a grant request carries.
    pub fn to_ne_bytes(self) -> [u8; 4] {
        self.0.to_ne_bytes()
    }

    /// Decode from a grant request payload.
    ///
    /// The payload must be exactly the size of a uid.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let raw: [u8; 4] = payload.try_into().ok()?;
        Some(Self(u32::from_ne_bytes(raw)))
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.0)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid:{}", self.0)
    }
}

impl From<u32> for Principal {
    fn from(uid: u32) -> Self {
        Self(uid)
    }
}

/// Access mode requested by an open call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    /// Decode the host's open flags word.
    pub fn from_flags(flags: u32) -> Result<Self, AccessError> {
        match flags {
            O_RDONLY => Ok(AccessMode::ReadOnly),
            O_WRONLY => Ok(AccessMode::WriteOnly),
            O_RDWR => Ok(AccessMode::ReadWrite),
            _ => Err(AccessError::InvalidMode),
        }
    }

    /// Encode back to the host's open flags word.
    pub fn to_flags(self) -> u32 {
        match self {
            AccessMode::ReadOnly => O_RDONLY,
            AccessMode::WriteOnly => O_WRONLY,
            AccessMode::ReadWrite => O_RDWR,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessMode::ReadOnly => "read-only",
            AccessMode::WriteOnly => "write-only",
            AccessMode::ReadWrite => "read-write",
        };
        f.write_str(s)
    }
}
