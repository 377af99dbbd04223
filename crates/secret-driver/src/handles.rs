//! Open-handle table: which endpoint holds which admitted open.
//!
//! The Device State only counts opens. The table remembers who made them,
//! so read, write, close and grant can be refused to an endpoint that
//! never got past the ownership guard.

use std::collections::BTreeMap;

use secret_driver_core::{AccessMode, CoreError, DeviceState};
use secret_driver_store::OpenHandle;

use crate::error::Result;
use crate::host::Endpoint;

/// Admitted opens, keyed by endpoint, in admission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleTable {
    open: BTreeMap<Endpoint, Vec<AccessMode>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an open the guard admitted.
    pub fn admit(&mut self, endpoint: Endpoint, mode: AccessMode) {
        self.open.entry(endpoint).or_default().push(mode);
    }

    /// Whether `endpoint` holds an open in `mode`.
    pub fn holds(&self, endpoint: Endpoint, mode: AccessMode) -> bool {
        self.modes(endpoint).contains(&mode)
    }

    /// Modes `endpoint` holds, oldest first.
    pub fn modes(&self, endpoint: Endpoint) -> &[AccessMode] {
        self.open.get(&endpoint).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop the most recent open held by `endpoint`.
    ///
    /// Returns `None` if it holds nothing.
    pub fn release(&mut self, endpoint: Endpoint) -> Option<AccessMode> {
        let modes = self.open.get_mut(&endpoint)?;
        let mode = modes.pop();
        if modes.is_empty() {
            self.open.remove(&endpoint);
        }
        mode
    }

    /// Total opens across all endpoints.
    pub fn len(&self) -> usize {
        self.open.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Flatten for a live-update snapshot.
    pub fn entries(&self) -> Vec<OpenHandle> {
        self.open
            .iter()
            .flat_map(|(endpoint, modes)| {
                modes.iter().map(move |&mode| OpenHandle {
                    holder: endpoint.0,
                    mode,
                })
            })
            .collect()
    }

    /// Rebuild from snapshot entries, checked against the restored device.
    pub fn from_entries(entries: &[OpenHandle], state: &DeviceState) -> Result<Self> {
        if entries.len() != state.open_count() as usize {
            return Err(invalid(format!(
                "{} handles recorded for {} opens",
                entries.len(),
                state.open_count()
            )));
        }
        if !entries.is_empty() && state.owner().is_none() {
            return Err(invalid("handles recorded for an unowned device".into()));
        }

        let mut table = Self::new();
        for entry in entries {
            match entry.mode {
                AccessMode::ReadWrite => {
                    return Err(invalid("read-write handle recorded".into()));
                }
                AccessMode::ReadOnly if !state.last_access_was_read() => {
                    return Err(invalid("read handle recorded but no read seen".into()));
                }
                mode => table.admit(Endpoint(entry.holder), mode),
            }
        }
        Ok(table)
    }
}

fn invalid(reason: String) -> crate::error::DriverError {
    CoreError::InvalidSnapshot(reason).into()
}
