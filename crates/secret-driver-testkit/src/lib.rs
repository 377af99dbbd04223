//! # Secret Driver Testkit
//!
//! Testing utilities for the secret driver.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a driver over an in-memory host with principals registered
//! - **Generators**: Proptest strategies for step sequences and payloads
//! - **Scenarios**: scripted sessions with the reply expected at every step
//!
//! ## Test Fixtures
//!
//! ```rust
//! use secret_driver::Reply;
//! use secret_driver_core::AccessMode;
//! use secret_driver_testkit::fixtures::{TestFixture, ALICE};
//!
//! let mut fixture = TestFixture::new();
//! fixture.open(ALICE, AccessMode::WriteOnly);
//! assert_eq!(fixture.write(ALICE, b"hello world"), Reply::Transferred(11));
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use secret_driver_testkit::{generators::steps, TestFixture};
//!
//! proptest! {
//!     #[test]
//!     fn cursors_stay_ordered(steps in steps(32, 64)) {
//!         let mut fixture = TestFixture::new();
//!         for step in &steps {
//!             fixture.apply(step);
//!             let buffer = fixture.state().buffer();
//!             prop_assert!(buffer.read_cursor() <= buffer.write_cursor());
//!         }
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod scenarios;

pub use fixtures::{endpoint, Step, TestFixture, ALICE, BOB, MALLORY};
pub use generators::{random_secret, steps};
pub use scenarios::{all_scenarios, run_scenario, verify_all_scenarios, Scenario};
