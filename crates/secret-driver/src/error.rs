//! Error types for the driver.

use secret_driver_core::{AccessError, CoreError};
use secret_driver_store::StoreError;
use thiserror::Error;

use crate::host::{Endpoint, HostError};

/// `EIO`: I/O error.
pub const EIO: i32 = 5;

/// `EBADF`: the caller holds no suitable open handle.
pub const EBADF: i32 = 9;

/// Errors that can occur during driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Access control rejected the request.
    #[error("access error: {0}")]
    Access(#[from] AccessError),

    /// The endpoint holds no open handle that permits the operation.
    #[error("{op} from {endpoint} without a matching open")]
    NotOpen { endpoint: Endpoint, op: &'static str },

    /// The host failed to resolve credentials or copy memory.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Live-update store error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Snapshot did not describe a valid device.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration parsed but is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The service loop has shut down.
    #[error("driver service closed")]
    ServiceClosed,
}

impl DriverError {
    /// The errno reported to the caller for this error.
    pub fn errno(&self) -> i32 {
        match self {
            DriverError::Access(e) => e.errno(),
            DriverError::Host(e) => e.errno(),
            DriverError::NotOpen { .. } => EBADF,
            _ => EIO,
        }
    }
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;
