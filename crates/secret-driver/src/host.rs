//! Host port: the driver's view of the host kernel.
//!
//! The host resolves a caller endpoint to its credentials and performs the
//! safe copies between the caller's address space and the driver. The
//! driver only ever names caller memory through an opaque [`GrantHandle`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use secret_driver_core::{Principal, EACCES, EFAULT};
use thiserror::Error;

/// The host's identifier for a calling process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint(pub u32);

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({})", self.0)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep:{}", self.0)
    }
}

/// Opaque host grant naming a region of caller memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrantHandle(pub u32);

/// Host-side failures.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("no credentials for {0}")]
    UnknownEndpoint(Endpoint),

    #[error("{endpoint} has no region {handle:?}")]
    BadHandle {
        endpoint: Endpoint,
        handle: GrantHandle,
    },

    #[error("copy of {len} bytes exceeds region of {size} bytes")]
    RegionTooSmall { len: usize, size: usize },

    #[error("host unavailable")]
    Unavailable,
}

impl HostError {
    /// The errno reported to the caller.
    pub fn errno(&self) -> i32 {
        match self {
            HostError::UnknownEndpoint(_) => EACCES,
            _ => EFAULT,
        }
    }
}

/// Services the host provides to the driver.
pub trait HostPort: Send {
    /// Resolve the principal behind an endpoint.
    fn credentials(&self, endpoint: Endpoint) -> Result<Principal, HostError>;

    /// Copy up to `len` bytes in from caller memory.
    ///
    /// Returns fewer bytes if the caller's region is shorter.
    fn copy_in(
        &self,
        endpoint: Endpoint,
        handle: GrantHandle,
        len: usize,
    ) -> Result<Bytes, HostError>;

    /// Copy `data` out to the start of caller memory.
    fn copy_out(
        &self,
        endpoint: Endpoint,
        handle: GrantHandle,
        data: &[u8],
    ) -> Result<(), HostError>;
}

/// An in-memory host for tests and the demo binary.
///
/// Clones share state, so a test can keep one clone to stage caller memory
/// while the driver owns another.
#[derive(Clone, Default)]
pub struct MemoryHost {
    inner: Arc<Mutex<MemoryHostInner>>,
}

#[derive(Default)]
struct MemoryHostInner {
    credentials: HashMap<Endpoint, Principal>,
    regions: HashMap<(Endpoint, GrantHandle), Vec<u8>>,
}

impl MemoryHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process.
    pub fn register(&self, endpoint: Endpoint, principal: Principal) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.credentials.insert(endpoint, principal);
        }
    }

    /// Expose a region of caller memory with the given contents.
    pub fn expose(&self, endpoint: Endpoint, handle: GrantHandle, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.regions.insert((endpoint, handle), bytes.into());
        }
    }

    /// Expose a zeroed region of `len` bytes.
    pub fn allocate(&self, endpoint: Endpoint, handle: GrantHandle, len: usize) {
        self.expose(endpoint, handle, vec![0u8; len]);
    }

    /// Current contents of a region.
    pub fn region(&self, endpoint: Endpoint, handle: GrantHandle) -> Option<Vec<u8>> {
        let inner = self.inner.lock().ok()?;
        inner.regions.get(&(endpoint, handle)).cloned()
    }
}

impl HostPort for MemoryHost {
    fn credentials(&self, endpoint: Endpoint) -> Result<Principal, HostError> {
        let inner = self.inner.lock().map_err(|_| HostError::Unavailable)?;
        inner
            .credentials
            .get(&endpoint)
            .copied()
            .ok_or(HostError::UnknownEndpoint(endpoint))
    }

    fn copy_in(
        &self,
        endpoint: Endpoint,
        handle: GrantHandle,
        len: usize,
    ) -> Result<Bytes, HostError> {
        let inner = self.inner.lock().map_err(|_| HostError::Unavailable)?;
        let region = inner
            .regions
            .get(&(endpoint, handle))
            .ok_or(HostError::BadHandle { endpoint, handle })?;
        let n = len.min(region.len());
        Ok(Bytes::copy_from_slice(&region[..n]))
    }

    fn copy_out(
        &self,
        endpoint: Endpoint,
        handle: GrantHandle,
        data: &[u8],
    ) -> Result<(), HostError> {
        let mut inner = self.inner.lock().map_err(|_| HostError::Unavailable)?;
        let region = inner
            .regions
            .get_mut(&(endpoint, handle))
            .ok_or(HostError::BadHandle { endpoint, handle })?;
        if data.len() > region.len() {
            return Err(HostError::RegionTooSmall {
                len: data.len(),
                size: region.len(),
            });
        }
        region[..data.len()].copy_from_slice(data);
        Ok(())
    }
}
