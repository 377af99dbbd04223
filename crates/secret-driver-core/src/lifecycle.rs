//! Lifecycle controller: handle counting and wipe-on-last-close.
//!
//! When the last handle closes, a device that was read since its last reset
//! is wiped back to the unowned baseline. A device that was only ever
//! written keeps its owner and content for a later reader.

use crate::state::DeviceState;

/// What a close did to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Other handles remain open.
    StillOpen { remaining: u32 },
    /// Last handle closed after a read: buffer wiped, owner cleared.
    Wiped,
    /// Last handle closed without a read: owner and content retained.
    Retained,
    /// Close with no open handle. The count stays at zero.
    Unbalanced,
}

impl CloseOutcome {
    /// Whether the device returned to the unowned baseline.
    pub fn wiped(&self) -> bool {
        matches!(self, CloseOutcome::Wiped)
    }
}

impl DeviceState {
    /// Release one handle. Never fails.
    pub fn close(&mut self) -> CloseOutcome {
        let unbalanced = self.open_count == 0;
        self.open_count = self.open_count.saturating_sub(1);

        if self.open_count > 0 {
            return CloseOutcome::StillOpen {
                remaining: self.open_count,
            };
        }

        if self.last_access_was_read {
            self.reset();
            return CloseOutcome::Wiped;
        }

        if unbalanced {
            CloseOutcome::Unbalanced
        } else {
            CloseOutcome::Retained
        }
    }
}
