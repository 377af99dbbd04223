//! # Secret Driver Core
//!
//! The access-control state machine behind the `/dev/secret` device.
//!
//! ## Overview
//!
//! One principal at a time may own the secret: a small fixed-capacity buffer.
//! The owner fills it by opening for write and drains it by opening for read.
//! When the last handle closes after a read, the buffer is wiped and the
//! device returns to its unowned baseline.
//!
//! ## Components
//!
//! - **Ownership Guard** ([`DeviceState::open`]): admits or rejects opens
//! - **Transfer Buffer** ([`TransferBuffer`]): sequential, truncating fill and drain
//! - **Grant Authority** ([`DeviceState::grant`]): reassigns ownership in place
//! - **Lifecycle Controller** ([`DeviceState::close`]): handle counting and wipe
//!
//! ## State Machine
//!
//! ```text
//!   Unowned --open--> OwnedActive --close (last, read seen)--> Unowned
//!                         |  ^
//!     close (last, no read)  |  open (owner)
//!                         v  |
//!                      OwnedIdle
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use secret_driver_core::{AccessMode, DeviceState, Principal};
//!
//! let alice = Principal::new(1000);
//! let mut device = DeviceState::new();
//!
//! device.open(alice, AccessMode::WriteOnly).unwrap();
//! device.write(b"hello world");
//! device.close();
//!
//! device.open(alice, AccessMode::ReadOnly).unwrap();
//! assert_eq!(device.read(64), b"hello world");
//! assert!(device.close().wiped());
//! ```

pub mod buffer;
pub mod error;
pub mod grant;
pub mod guard;
pub mod lifecycle;
pub mod policy;
pub mod snapshot;
pub mod state;
pub mod types;

pub use buffer::TransferBuffer;
pub use error::{AccessError, CoreError, Result, EACCES, EFAULT, ENOSPC, ENOTTY};
pub use grant::{ControlRequest, GRANT_REQUEST};
pub use lifecycle::CloseOutcome;
pub use policy::{AccessPolicy, GrantPolicy, UnownedReadPolicy};
pub use snapshot::DeviceSnapshot;
pub use state::{DevicePhase, DeviceState};
pub use types::{AccessMode, Principal, O_RDONLY, O_RDWR, O_WRONLY, SECRET_CAPACITY};
