//! # Secret Driver
//!
//! The `/dev/secret` character driver: a one-shot, owner-scoped mailbox.
//!
//! ## Overview
//!
//! A process opens the device for write and stores a secret. It may hand
//! ownership to another uid with the grant control request. The owner then
//! opens for read and drains the secret; when the last handle closes after
//! that read, the secret is wiped.
//!
//! This crate wires the access-control core to a host:
//!
//! - **Dispatch** ([`SecretDriver::dispatch`]): one request at a time, errors as errno replies
//! - **Handle table** ([`HandleTable`]): which endpoint holds which admitted open
//! - **Host port** ([`HostPort`]): caller credentials and grant-based memory copies
//! - **Service loop** ([`service::spawn`]): async request channel in front of the driver
//! - **Live update** ([`SecretDriver::prepare_live_update`], [`SecretDriver::init`])
//!
//! ## Usage
//!
//! ```rust,no_run
//! use secret_driver::{DriverConfig, Endpoint, GrantHandle, MemoryHost, SecretDriver};
//! use secret_driver::core::{Principal, O_WRONLY};
//!
//! async fn example() {
//!     let host = MemoryHost::new();
//!     host.register(Endpoint(1), Principal::new(1000));
//!     host.expose(Endpoint(1), GrantHandle(1), b"hello world".to_vec());
//!
//!     let (handle, task) = secret_driver::service::spawn(SecretDriver::new(
//!         DriverConfig::default(),
//!         host,
//!     ));
//!
//!     handle.open(Endpoint(1), O_WRONLY).await.unwrap();
//!     handle.write(Endpoint(1), GrantHandle(1), 11).await.unwrap();
//!     handle.close(Endpoint(1)).await.unwrap();
//!
//!     drop(handle);
//!     let _driver = task.await.unwrap();
//! }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod handles;
pub mod host;
pub mod operation;
pub mod service;

// Re-export component crates
pub use secret_driver_core as core;
pub use secret_driver_store as store;

pub use config::DriverConfig;
pub use driver::{DeviceGeometry, InitKind, InitOutcome, Partition, SecretDriver};
pub use error::{DriverError, Result, EBADF, EIO};
pub use handles::HandleTable;
pub use host::{Endpoint, GrantHandle, HostError, HostPort, MemoryHost};
pub use operation::{Operation, Reply, Request};
pub use service::DriverHandle;
