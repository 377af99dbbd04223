//! Driver configuration.

use serde::Deserialize;

use secret_driver_core::{AccessPolicy, GrantPolicy, UnownedReadPolicy, SECRET_CAPACITY};

use crate::error::{DriverError, Result};

/// Configuration for the driver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Name the driver reports to the host.
    pub device_name: String,
    /// Node the device is reachable through.
    pub device_path: String,
    /// Capacity of the secret buffer in bytes.
    pub capacity: usize,
    /// Behaviour of a read-only open on an unowned device.
    pub unowned_read: UnownedReadPolicy,
    /// Who may reassign ownership.
    pub grant_policy: GrantPolicy,
    /// Requests buffered in front of the service loop.
    pub queue_depth: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            device_name: "secret".to_string(),
            device_path: "/dev/secret".to_string(),
            capacity: SECRET_CAPACITY,
            unowned_read: UnownedReadPolicy::default(),
            grant_policy: GrantPolicy::default(),
            queue_depth: 32,
        }
    }
}

impl DriverConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the driver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(DriverError::InvalidConfig("capacity must be non-zero".into()));
        }
        if self.queue_depth == 0 {
            return Err(DriverError::InvalidConfig(
                "queue_depth must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The access policy the device enforces.
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy {
            unowned_read: self.unowned_read,
            grant: self.grant_policy,
        }
    }
}
