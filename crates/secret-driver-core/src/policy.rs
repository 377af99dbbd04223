//! Access policies for the two decisions the device leaves configurable.

use serde::{Deserialize, Serialize};

/// What a read-only open of an unowned device does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnownedReadPolicy {
    /// The reader becomes the owner.
    #[default]
    Claim,
    /// The open is rejected with `PermissionDenied`.
    Deny,
}

/// Who may issue a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantPolicy {
    /// Any caller that reaches the control operation may reassign ownership.
    #[default]
    Permissive,
    /// Only the current owner may reassign ownership.
    OwnerOnly,
}

/// The combined policy a [`DeviceState`](crate::DeviceState) enforces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub unowned_read: UnownedReadPolicy,
    pub grant: GrantPolicy,
}

impl AccessPolicy {
    /// Policy with every hardening switch turned on.
    pub fn strict() -> Self {
        Self {
            unowned_read: UnownedReadPolicy::Deny,
            grant: GrantPolicy::OwnerOnly,
        }
    }
}
