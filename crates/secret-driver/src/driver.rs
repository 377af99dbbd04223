//! The driver: dispatches host requests onto the Device State.
//!
//! Every request is handled to completion before the next one is accepted.
//! [`SecretDriver::dispatch`] never fails; errors become errno replies and
//! leave the device usable.

use secret_driver_core::{AccessError, AccessMode, CloseOutcome, DeviceState, GRANT_REQUEST};
use secret_driver_store::{restore_snapshot, save_snapshot, SavedState, StateStore};

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::handles::HandleTable;
use crate::host::{Endpoint, HostPort};
use crate::operation::{Operation, Reply, Request};

/// Size, in bytes, of the grant argument (a uid).
const GRANT_ARG_LEN: usize = 4;

/// How the host started this driver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitKind {
    /// First start.
    Fresh,
    /// Replacing a previous version that saved its state.
    LiveUpdate,
    /// Restarted after a crash.
    Restart,
}

/// Result of driver initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitOutcome {
    /// Whether the driver should announce itself to the host.
    pub announce: bool,
    /// Whether state was restored from a live-update snapshot.
    pub restored: bool,
}

/// Extent the host reports for the device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    pub base: u64,
    pub size: u64,
}

/// Disk-style geometry. A character device has none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Partition {
    pub cylinders: u32,
    pub heads: u32,
    pub sectors: u32,
}

/// The secret driver.
///
/// Owns the Device State, the open-handle table and the host port. Holds no
/// locks: the caller guarantees one request at a time by holding `&mut self`.
pub struct SecretDriver<H: HostPort> {
    config: DriverConfig,
    host: H,
    state: DeviceState,
    handles: HandleTable,
}

impl<H: HostPort> SecretDriver<H> {
    /// Create a driver with a baseline device.
    pub fn new(config: DriverConfig, host: H) -> Self {
        let state = DeviceState::with_capacity(config.capacity, config.policy());
        Self {
            config,
            host,
            state,
            handles: HandleTable::new(),
        }
    }

    /// Create a driver for the given start mode.
    ///
    /// On [`InitKind::LiveUpdate`] the previous instance's snapshot and
    /// handle table are restored from `store`; an empty store yields a
    /// baseline device.
    pub async fn init<S: StateStore + ?Sized>(
        config: DriverConfig,
        host: H,
        kind: InitKind,
        store: &S,
    ) -> Result<(Self, InitOutcome)> {
        config.validate()?;
        let mut driver = Self::new(config, host);

        let outcome = match kind {
            InitKind::Fresh => InitOutcome {
                announce: true,
                restored: false,
            },
            InitKind::LiveUpdate => {
                let restored = match restore_snapshot(store).await? {
                    Some(saved) => {
                        driver.state = DeviceState::restore(
                            saved.device,
                            driver.config.capacity,
                            driver.config.policy(),
                        )?;
                        driver.handles = HandleTable::from_entries(&saved.handles, &driver.state)?;
                        true
                    }
                    None => false,
                };
                InitOutcome {
                    announce: false,
                    restored,
                }
            }
            InitKind::Restart => InitOutcome {
                announce: true,
                restored: false,
            },
        };

        tracing::info!(
            device = %driver.config.device_name,
            ?kind,
            restored = outcome.restored,
            owner = ?driver.state.owner(),
            handles = driver.handles.len(),
            "driver initialized"
        );
        if outcome.announce {
            tracing::info!(path = %driver.config.device_path, "driver announced");
        }

        Ok((driver, outcome))
    }

    /// Save the full Device State and open handles for a successor instance.
    ///
    /// Returns the snapshot digest.
    pub async fn prepare_live_update<S: StateStore + ?Sized>(&self, store: &S) -> Result<[u8; 32]> {
        let saved = SavedState {
            device: self.state.snapshot(),
            handles: self.handles.entries(),
        };
        let digest = save_snapshot(store, &saved).await?;
        Ok(digest)
    }

    /// Name the driver reports to the host.
    pub fn name(&self) -> &str {
        &self.config.device_name
    }

    /// The device's extent: always based at 0, sized to the stored content.
    pub fn prepare(&self) -> DeviceGeometry {
        DeviceGeometry {
            base: 0,
            size: self.state.buffer().content_len() as u64,
        }
    }

    /// Disk geometry, all zero.
    pub fn geometry(&self) -> Partition {
        Partition::default()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Handle one request. Never fails; errors become errno replies.
    pub fn dispatch(&mut self, request: &Request) -> Reply {
        match self.handle(request) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    endpoint = %request.endpoint,
                    op = request.op.name(),
                    error = %e,
                    "request rejected"
                );
                Reply::Error { errno: e.errno() }
            }
        }
    }

    fn handle(&mut self, request: &Request) -> Result<Reply> {
        let endpoint = request.endpoint;
        let op = request.op;

        match op {
            Operation::Open { flags } => {
                let principal = self.host.credentials(endpoint)?;
                let mode = self.state.open_with_flags(principal, flags)?;
                self.handles.admit(endpoint, mode);
                tracing::debug!(
                    %endpoint,
                    %principal,
                    ?mode,
                    open_count = self.state.open_count(),
                    "open admitted"
                );
                Ok(Reply::Ok)
            }
            Operation::Close => {
                self.handles
                    .release(endpoint)
                    .ok_or_else(|| not_open(endpoint, &op))?;
                let outcome = self.state.close();
                match outcome {
                    CloseOutcome::Wiped => tracing::info!(%endpoint, "secret wiped"),
                    CloseOutcome::Unbalanced => {
                        tracing::warn!(%endpoint, "close without a matching open")
                    }
                    CloseOutcome::Retained => {
                        tracing::debug!(%endpoint, owner = ?self.state.owner(), "secret retained")
                    }
                    CloseOutcome::StillOpen { remaining } => {
                        tracing::debug!(%endpoint, remaining, "handle closed")
                    }
                }
                Ok(Reply::Ok)
            }
            Operation::Read { handle, len } => {
                self.require(endpoint, AccessMode::ReadOnly, &op)?;
                let host = &self.host;
                let n = self
                    .state
                    .read_with(len, |chunk| host.copy_out(endpoint, handle, chunk))?;
                tracing::debug!(%endpoint, requested = len, transferred = n, "read");
                Ok(Reply::Transferred(n))
            }
            Operation::Write { handle, len } => {
                self.require(endpoint, AccessMode::WriteOnly, &op)?;
                let n = len.min(self.state.buffer().writable());
                let written = if n == 0 {
                    0
                } else {
                    let bytes = self.host.copy_in(endpoint, handle, n)?;
                    self.state.write(&bytes)
                };
                tracing::debug!(%endpoint, requested = len, transferred = written, "write");
                Ok(Reply::Transferred(written))
            }
            Operation::Grant { request, handle } => {
                if request != GRANT_REQUEST {
                    return Err(AccessError::UnsupportedOperation.into());
                }
                if self.handles.modes(endpoint).is_empty() {
                    return Err(not_open(endpoint, &op));
                }
                let requester = self.host.credentials(endpoint)?;
                let payload = self.host.copy_in(endpoint, handle, GRANT_ARG_LEN)?;
                let decoded = self.state.control(requester, request, &payload)?;
                tracing::info!(%endpoint, %requester, ?decoded, "ownership granted");
                Ok(Reply::Ok)
            }
        }
    }

    fn require(&self, endpoint: Endpoint, mode: AccessMode, op: &Operation) -> Result<()> {
        if self.handles.holds(endpoint, mode) {
            Ok(())
        } else {
            Err(not_open(endpoint, op))
        }
    }

    /// Consume the driver, returning its host port.
    pub fn into_host(self) -> H {
        self.host
    }
}

fn not_open(endpoint: Endpoint, op: &Operation) -> DriverError {
    DriverError::NotOpen {
        endpoint,
        op: op.name(),
    }
}
