//! Grant authority: reassigning ownership without closing the device.
//!
//! A grant carries the new owner's uid as a 4-byte payload copied in by the
//! host. It moves the claim only; cursors, content and handle count are
//! untouched, so a writer can hand the secret to a reader process.

use crate::error::AccessError;
use crate::policy::GrantPolicy;
use crate::state::DeviceState;
use crate::types::Principal;

/// The control request code for grant (`_IOW('K', 1, uid_t)`).
pub const GRANT_REQUEST: u32 = 0x4004_4B01;

/// A decoded control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Reassign ownership to the given principal.
    Grant { grantee: Principal },
}

impl ControlRequest {
    /// Decode a raw request code and its payload.
    ///
    /// Anything other than a grant with a uid-sized payload is unsupported.
    pub fn decode(request: u32, payload: &[u8]) -> Result<Self, AccessError> {
        if request != GRANT_REQUEST {
            return Err(AccessError::UnsupportedOperation);
        }
        let grantee = Principal::from_payload(payload).ok_or(AccessError::UnsupportedOperation)?;
        Ok(ControlRequest::Grant { grantee })
    }
}

impl DeviceState {
    /// Reassign ownership to `grantee` on behalf of `requester`.
    ///
    /// Under [`GrantPolicy::Permissive`] the requester is not checked against
    /// the owner.
    pub fn grant(&mut self, requester: Principal, grantee: Principal) -> Result<(), AccessError> {
        let owner = self.owner.ok_or(AccessError::PermissionDenied)?;

        if self.policy.grant == GrantPolicy::OwnerOnly && owner != requester {
            return Err(AccessError::PermissionDenied);
        }

        self.owner = Some(grantee);
        Ok(())
    }

    /// Apply a raw control request.
    pub fn control(
        &mut self,
        requester: Principal,
        request: u32,
        payload: &[u8],
    ) -> Result<ControlRequest, AccessError> {
        let decoded = ControlRequest::decode(request, payload)?;
        match decoded {
            ControlRequest::Grant { grantee } => self.grant(requester, grantee)?,
        }
        Ok(decoded)
    }
}
