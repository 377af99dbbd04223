//! Test fixtures and helpers.
//!
//! A [`TestFixture`] owns a driver over a [`MemoryHost`] with a few
//! principals registered. Each principal calls from the endpoint numbered
//! after its uid.

use secret_driver::{
    DriverConfig, Endpoint, GrantHandle, MemoryHost, Operation, Reply, Request, SecretDriver,
};
use secret_driver_core::{AccessMode, DeviceState, Principal, GRANT_REQUEST};

pub const ALICE: Principal = Principal::new(1000);
pub const BOB: Principal = Principal::new(1001);
pub const MALLORY: Principal = Principal::new(666);

/// One caller action against the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Open(Principal, AccessMode),
    Write(Principal, Vec<u8>),
    Read(Principal, usize),
    Grant(Principal, Principal),
    Close(Principal),
}

/// A driver with registered principals.
pub struct TestFixture {
    pub host: MemoryHost,
    pub driver: SecretDriver<MemoryHost>,
    next_handle: u32,
}

impl TestFixture {
    /// Create a fixture with the default config.
    pub fn new() -> Self {
        Self::with_config(DriverConfig::default())
    }

    /// Create a fixture with an explicit config.
    pub fn with_config(config: DriverConfig) -> Self {
        let host = MemoryHost::new();
        for principal in [ALICE, BOB, MALLORY] {
            host.register(endpoint(principal), principal);
        }
        let driver = SecretDriver::new(config, host.clone());
        Self {
            host,
            driver,
            next_handle: 1,
        }
    }

    pub fn state(&self) -> &DeviceState {
        self.driver.state()
    }

    /// Whether `principal` currently holds an open in `mode`.
    pub fn holds(&self, principal: Principal, mode: AccessMode) -> bool {
        self.driver.handles().holds(endpoint(principal), mode)
    }

    /// Whether `principal` holds any open at all.
    pub fn holds_any(&self, principal: Principal) -> bool {
        !self.driver.handles().modes(endpoint(principal)).is_empty()
    }

    fn handle(&mut self) -> GrantHandle {
        let handle = GrantHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn dispatch(&mut self, principal: Principal, op: Operation) -> Reply {
        self.driver.dispatch(&Request::new(endpoint(principal), op))
    }

    pub fn open(&mut self, principal: Principal, mode: AccessMode) -> Reply {
        self.dispatch(
            principal,
            Operation::Open {
                flags: mode.to_flags(),
            },
        )
    }

    /// Write `bytes` from a freshly exposed caller region.
    pub fn write(&mut self, principal: Principal, bytes: &[u8]) -> Reply {
        let handle = self.handle();
        self.host.expose(endpoint(principal), handle, bytes.to_vec());
        self.dispatch(
            principal,
            Operation::Write {
                handle,
                len: bytes.len(),
            },
        )
    }

    /// Read up to `len` bytes; returns the reply and the bytes delivered.
    pub fn read(&mut self, principal: Principal, len: usize) -> (Reply, Vec<u8>) {
        let handle = self.handle();
        self.host.allocate(endpoint(principal), handle, len);
        let reply = self.dispatch(principal, Operation::Read { handle, len });
        let mut bytes = self
            .host
            .region(endpoint(principal), handle)
            .unwrap_or_default();
        bytes.truncate(reply.transferred());
        (reply, bytes)
    }

    pub fn grant(&mut self, principal: Principal, grantee: Principal) -> Reply {
        self.control(principal, GRANT_REQUEST, &grantee.to_ne_bytes())
    }

    /// Issue a raw control request with `payload` as its argument.
    pub fn control(&mut self, principal: Principal, request: u32, payload: &[u8]) -> Reply {
        let handle = self.handle();
        self.host.expose(endpoint(principal), handle, payload.to_vec());
        self.dispatch(principal, Operation::Grant { request, handle })
    }

    pub fn close(&mut self, principal: Principal) -> Reply {
        self.dispatch(principal, Operation::Close)
    }

    /// Apply one step.
    pub fn apply(&mut self, step: &Step) -> Reply {
        match step {
            Step::Open(p, mode) => self.open(*p, *mode),
            Step::Write(p, bytes) => self.write(*p, bytes),
            Step::Read(p, len) => self.read(*p, *len).0,
            Step::Grant(p, grantee) => self.grant(*p, *grantee),
            Step::Close(p) => self.close(*p),
        }
    }

    /// Apply steps in order, collecting replies.
    pub fn run(&mut self, steps: &[Step]) -> Vec<Reply> {
        steps.iter().map(|step| self.apply(step)).collect()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// The endpoint a principal calls from.
pub fn endpoint(principal: Principal) -> Endpoint {
    Endpoint(principal.uid())
}
