//! Device State: the single mutable record every operation threads through.
//!
//! The guard ([`crate::guard`]), grant authority ([`crate::grant`]) and
//! lifecycle controller ([`crate::lifecycle`]) each contribute an `impl`
//! block on [`DeviceState`]. Requests are applied one at a time through
//! `&mut DeviceState`, so no interior locking exists.

use crate::buffer::TransferBuffer;
use crate::policy::AccessPolicy;
use crate::types::{Principal, SECRET_CAPACITY};

/// Coarse phase of the device, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePhase {
    /// No owner, no handles, buffer wiped.
    Unowned,
    /// Owned with at least one open handle.
    OwnedActive,
    /// Owned with no open handles; content retained for a later reader.
    OwnedIdle,
}

/// The state of the secret device.
#[derive(Debug)]
pub struct DeviceState {
    pub(crate) owner: Option<Principal>,
    pub(crate) buffer: TransferBuffer,
    pub(crate) open_count: u32,
    pub(crate) last_access_was_read: bool,
    pub(crate) policy: AccessPolicy,
}

impl DeviceState {
    /// Create a baseline device with the default capacity and policy.
    pub fn new() -> Self {
        Self::with_capacity(SECRET_CAPACITY, AccessPolicy::default())
    }

    /// Create a baseline device with an explicit capacity and policy.
    pub fn with_capacity(capacity: usize, policy: AccessPolicy) -> Self {
        Self {
            owner: None,
            buffer: TransferBuffer::new(capacity),
            open_count: 0,
            last_access_was_read: false,
            policy,
        }
    }

    /// The current owner, if any.
    pub fn owner(&self) -> Option<Principal> {
        self.owner
    }

    /// Number of open handles.
    pub fn open_count(&self) -> u32 {
        self.open_count
    }

    /// Whether the most recent successful open was for reading.
    pub fn last_access_was_read(&self) -> bool {
        self.last_access_was_read
    }

    /// The policy this device enforces.
    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Read-only view of the transfer buffer.
    pub fn buffer(&self) -> &TransferBuffer {
        &self.buffer
    }

    /// Append bytes to the secret. Returns the number of bytes stored.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        self.buffer.write(bytes)
    }

    /// Drain up to `max_len` bytes of the secret.
    pub fn read(&mut self, max_len: usize) -> &[u8] {
        self.buffer.read(max_len)
    }

    /// Drain up to `max_len` bytes through `f`; see [`TransferBuffer::read_with`].
    pub fn read_with<E>(
        &mut self,
        max_len: usize,
        f: impl FnOnce(&[u8]) -> Result<(), E>,
    ) -> Result<usize, E> {
        self.buffer.read_with(max_len, f)
    }

    /// Derive the current phase.
    pub fn phase(&self) -> DevicePhase {
        match (self.owner, self.open_count) {
            (None, _) => DevicePhase::Unowned,
            (Some(_), 0) => DevicePhase::OwnedIdle,
            (Some(_), _) => DevicePhase::OwnedActive,
        }
    }

    /// Whether the device is at its wiped, unowned baseline.
    pub fn is_baseline(&self) -> bool {
        self.owner.is_none()
            && self.open_count == 0
            && !self.last_access_was_read
            && self.buffer.is_wiped()
    }

    /// Return to the baseline: zero the buffer, clear owner and read flag.
    pub(crate) fn reset(&mut self) {
        self.buffer.wipe();
        self.owner = None;
        self.last_access_was_read = false;
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_baseline() {
        let state = DeviceState::new();
        assert!(state.is_baseline());
        assert_eq!(state.phase(), DevicePhase::Unowned);
        assert_eq!(state.buffer().capacity(), SECRET_CAPACITY);
    }

    #[test]
    fn test_phase_derivation() {
        let mut state = DeviceState::new();
        state.owner = Some(Principal::new(7));
        assert_eq!(state.phase(), DevicePhase::OwnedIdle);
        state.open_count = 2;
        assert_eq!(state.phase(), DevicePhase::OwnedActive);
    }

    #[test]
    fn test_reset_keeps_open_count() {
        let mut state = DeviceState::new();
        state.owner = Some(Principal::new(7));
        state.open_count = 2;
        state.last_access_was_read = true;
        state.write(b"abc");
        state.reset();

        assert_eq!(state.open_count(), 2);
        assert_eq!(state.owner(), None);
        assert!(!state.last_access_was_read());
        assert!(state.buffer().is_wiped());
    }
}
