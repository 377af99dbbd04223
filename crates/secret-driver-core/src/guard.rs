//! Ownership guard: admission of open requests.
//!
//! An open either claims an unowned device, joins the owner's existing
//! claim as an additional reader, or is rejected. A rejected open changes
//! nothing.

use crate::error::AccessError;
use crate::policy::UnownedReadPolicy;
use crate::state::DeviceState;
use crate::types::{AccessMode, Principal};

impl DeviceState {
    /// Admit or reject an open by `principal` in `mode`.
    pub fn open(&mut self, principal: Principal, mode: AccessMode) -> Result<(), AccessError> {
        match (self.owner, mode) {
            (_, AccessMode::ReadWrite) => return Err(AccessError::InvalidMode),
            (None, AccessMode::WriteOnly) => {
                self.owner = Some(principal);
            }
            (None, AccessMode::ReadOnly) => {
                if self.policy.unowned_read == UnownedReadPolicy::Deny {
                    return Err(AccessError::PermissionDenied);
                }
                self.owner = Some(principal);
                self.last_access_was_read = true;
            }
            (Some(owner), _) if owner != principal => {
                return Err(AccessError::PermissionDenied);
            }
            (Some(_), AccessMode::ReadOnly) => {
                self.last_access_was_read = true;
            }
            // One writer session per claim.
            (Some(_), AccessMode::WriteOnly) => return Err(AccessError::CapacityExceeded),
        }

        self.open_count += 1;
        Ok(())
    }

    /// Admit an open given the host's raw flags word. Returns the admitted mode.
    pub fn open_with_flags(
        &mut self,
        principal: Principal,
        flags: u32,
    ) -> Result<AccessMode, AccessError> {
        let mode = AccessMode::from_flags(flags)?;
        self.open(principal, mode)?;
        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AccessPolicy;
    use crate::state::DevicePhase;
    use crate::types::{O_RDWR, SECRET_CAPACITY};

    const ALICE: Principal = Principal::new(1000);
    const BOB: Principal = Principal::new(1001);

    #[test]
    fn test_write_open_claims_ownership() {
        let mut state = DeviceState::new();
        state.open(ALICE, AccessMode::WriteOnly).unwrap();

        assert_eq!(state.owner(), Some(ALICE));
        assert_eq!(state.open_count(), 1);
        assert!(!state.last_access_was_read());
        assert_eq!(state.phase(), DevicePhase::OwnedActive);
    }

    #[test]
    fn test_read_open_claims_unowned_device() {
        let mut state = DeviceState::new();
        state.open(ALICE, AccessMode::ReadOnly).unwrap();

        assert_eq!(state.owner(), Some(ALICE));
        assert!(state.last_access_was_read());
        assert_eq!(state.open_count(), 1);
    }

    #[test]
    fn test_read_open_denied_on_unowned_under_deny_policy() {
        let mut state = DeviceState::with_capacity(SECRET_CAPACITY, AccessPolicy::strict());
        assert_eq!(
            state.open(ALICE, AccessMode::ReadOnly),
            Err(AccessError::PermissionDenied)
        );
        assert!(state.is_baseline());

        // Writers still claim.
        state.open(ALICE, AccessMode::WriteOnly).unwrap();
        assert_eq!(state.owner(), Some(ALICE));
    }

    #[test]
    fn test_read_write_always_rejected() {
        let mut state = DeviceState::new();
        assert_eq!(
            state.open(ALICE, AccessMode::ReadWrite),
            Err(AccessError::InvalidMode)
        );
        assert!(state.is_baseline());

        state.open(ALICE, AccessMode::WriteOnly).unwrap();
        assert_eq!(
            state.open(ALICE, AccessMode::ReadWrite),
            Err(AccessError::InvalidMode)
        );
        assert_eq!(
            state.open_with_flags(BOB, O_RDWR),
            Err(AccessError::InvalidMode)
        );
        assert_eq!(state.open_count(), 1);
    }

    #[test]
    fn test_other_principal_denied() {
        let mut state = DeviceState::new();
        state.open(ALICE, AccessMode::WriteOnly).unwrap();

        assert_eq!(
            state.open(BOB, AccessMode::ReadOnly),
            Err(AccessError::PermissionDenied)
        );
        assert_eq!(
            state.open(BOB, AccessMode::WriteOnly),
            Err(AccessError::PermissionDenied)
        );
        assert_eq!(state.owner(), Some(ALICE));
        assert_eq!(state.open_count(), 1);
    }

    #[test]
    fn test_owner_second_writer_rejected() {
        let mut state = DeviceState::new();
        state.open(ALICE, AccessMode::WriteOnly).unwrap();

        assert_eq!(
            state.open(ALICE, AccessMode::WriteOnly),
            Err(AccessError::CapacityExceeded)
        );
        assert_eq!(state.open_count(), 1);
    }

    #[test]
    fn test_owner_additional_readers() {
        let mut state = DeviceState::new();
        state.open(ALICE, AccessMode::WriteOnly).unwrap();
        state.open(ALICE, AccessMode::ReadOnly).unwrap();
        state.open(ALICE, AccessMode::ReadOnly).unwrap();

        assert_eq!(state.open_count(), 3);
        assert!(state.last_access_was_read());
    }

    #[test]
    fn test_unknown_flags_rejected() {
        let mut state = DeviceState::new();
        assert_eq!(state.open_with_flags(ALICE, 0), Err(AccessError::InvalidMode));
        assert!(state.is_baseline());

        assert_eq!(
            state.open_with_flags(ALICE, crate::types::O_WRONLY),
            Ok(AccessMode::WriteOnly)
        );
    }
}
