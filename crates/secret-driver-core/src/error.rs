//! Error types for the secret driver core.

use thiserror::Error;

/// `EACCES`: permission denied.
pub const EACCES: i32 = 13;

/// `EFAULT`: bad address.
pub const EFAULT: i32 = 14;

/// `ENOTTY`: inappropriate ioctl for device.
pub const ENOTTY: i32 = 25;

/// `ENOSPC`: no space left on device.
pub const ENOSPC: i32 = 28;

/// Access-control failures reported to a caller.
///
/// None of these are fatal: a rejected request leaves the device unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Open requested with a mode other than read-only or write-only.
    #[error("invalid access mode")]
    InvalidMode,

    /// The caller is not the owner of the secret.
    #[error("permission denied")]
    PermissionDenied,

    /// The owner asked for a second writer session.
    #[error("secret already held")]
    CapacityExceeded,

    /// A control request other than grant, or a malformed grant payload.
    #[error("unsupported control operation")]
    UnsupportedOperation,
}

impl AccessError {
    /// The errno the host reports back to the caller.
    pub fn errno(&self) -> i32 {
        match self {
            AccessError::InvalidMode | AccessError::PermissionDenied => EACCES,
            AccessError::CapacityExceeded => ENOSPC,
            AccessError::UnsupportedOperation => ENOTTY,
        }
    }
}

/// Errors raised while rebuilding state from a snapshot.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(AccessError::InvalidMode.errno(), EACCES);
        assert_eq!(AccessError::PermissionDenied.errno(), EACCES);
        assert_eq!(AccessError::CapacityExceeded.errno(), ENOSPC);
        assert_eq!(AccessError::UnsupportedOperation.errno(), ENOTTY);
    }
}
