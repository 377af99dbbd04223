//! # Secret Driver Store
//!
//! Live-update storage for the secret driver. Provides a trait-based
//! key/value interface with SQLite and in-memory implementations, and the
//! per-field snapshot save/restore built on top of it.
//!
//! ## Overview
//!
//! Before the host replaces a running driver with a new version, the old
//! instance publishes its full Device State to the store, one key per field.
//! The driver's open-handle table travels alongside it. The successor
//! restores and consumes those keys during its live-update init, resuming
//! with bit-identical state.
//!
//! ## Key Types
//!
//! - [`StateStore`] - The async trait for publish/retrieve/delete
//! - [`StateStoreExt`] - Typed CBOR helpers
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`SavedState`] - Device State plus open handles
//! - [`save_snapshot`] / [`restore_snapshot`] - hand-off between instances
//!
//! ## Usage
//!
//! ```rust,no_run
//! use secret_driver_core::DeviceState;
//! use secret_driver_store::{restore_snapshot, save_snapshot, MemoryStore, SavedState};
//!
//! async fn example() {
//!     let store = MemoryStore::new();
//!     let saved = SavedState {
//!         device: DeviceState::new().snapshot(),
//!         handles: Vec::new(),
//!     };
//!
//!     save_snapshot(&store, &saved).await.unwrap();
//!     let restored = restore_snapshot(&store).await.unwrap();
//!     assert_eq!(restored, Some(saved));
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod snapshot;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use snapshot::{
    clear_snapshot, restore_snapshot, save_snapshot, OpenHandle, SavedState, SNAPSHOT_KEYS,
};
pub use sqlite::SqliteStore;
pub use traits::{StateStore, StateStoreExt};
