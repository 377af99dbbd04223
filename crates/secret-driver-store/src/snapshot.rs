//! Per-field save and restore of the live-update state.
//!
//! Each Device State field is published under its own key, next to the
//! driver's open-handle table and a `digest` key holding the BLAKE3 digest
//! of all of it. Restore reads every field back, checks the digest, and then
//! deletes the keys so a snapshot is consumed exactly once.

use secret_driver_core::{AccessMode, DeviceSnapshot, Principal};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::traits::{encode, StateStore, StateStoreExt};

pub const KEY_OWNER: &str = "owner";
pub const KEY_BUFFER: &str = "buffer";
pub const KEY_WRITE_CURSOR: &str = "write_cursor";
pub const KEY_READ_CURSOR: &str = "read_cursor";
pub const KEY_OPEN_COUNT: &str = "open_count";
pub const KEY_LAST_ACCESS_WAS_READ: &str = "last_access_was_read";
pub const KEY_HANDLES: &str = "handles";
pub const KEY_DIGEST: &str = "digest";

/// Every key a saved snapshot occupies.
pub const SNAPSHOT_KEYS: [&str; 8] = [
    KEY_OWNER,
    KEY_BUFFER,
    KEY_WRITE_CURSOR,
    KEY_READ_CURSOR,
    KEY_OPEN_COUNT,
    KEY_LAST_ACCESS_WAS_READ,
    KEY_HANDLES,
    KEY_DIGEST,
];

/// One admitted open: the host's id for the caller and the mode it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenHandle {
    pub holder: u32,
    pub mode: AccessMode,
}

/// Everything a driver hands to its successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedState {
    pub device: DeviceSnapshot,
    pub handles: Vec<OpenHandle>,
}

impl SavedState {
    /// BLAKE3 digest over the device snapshot and the handle table.
    pub fn digest(&self) -> Result<[u8; 32]> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.device.digest()?);
        hasher.update(&encode(&self.handles)?);
        Ok(*hasher.finalize().as_bytes())
    }
}

/// Wrapper that encodes raw bytes as a CBOR byte string.
#[derive(Serialize, Deserialize)]
struct Blob(#[serde(with = "secret_driver_core::snapshot::byte_string")] Vec<u8>);

/// Publish `saved` field by field. Returns its digest.
pub async fn save_snapshot<S: StateStore + ?Sized>(
    store: &S,
    saved: &SavedState,
) -> Result<[u8; 32]> {
    let digest = saved.digest()?;
    let device = &saved.device;

    store.publish_value(KEY_OWNER, &device.owner).await?;
    store
        .publish_value(KEY_BUFFER, &Blob(device.buffer.clone()))
        .await?;
    store
        .publish_value(KEY_WRITE_CURSOR, &device.write_cursor)
        .await?;
    store
        .publish_value(KEY_READ_CURSOR, &device.read_cursor)
        .await?;
    store.publish_u32(KEY_OPEN_COUNT, device.open_count).await?;
    store
        .publish_bool(KEY_LAST_ACCESS_WAS_READ, device.last_access_was_read)
        .await?;
    store.publish_value(KEY_HANDLES, &saved.handles).await?;
    // Digest last: its presence marks a complete snapshot.
    store.publish_value(KEY_DIGEST, &Blob(digest.to_vec())).await?;

    tracing::info!(
        digest = %hex::encode(digest),
        handles = saved.handles.len(),
        "device state saved"
    );
    Ok(digest)
}

/// Read back a saved snapshot, verify it, and consume its keys.
///
/// Returns `None` if no snapshot was published.
pub async fn restore_snapshot<S: StateStore + ?Sized>(store: &S) -> Result<Option<SavedState>> {
    let Some(Blob(expected)) = store.retrieve_value::<Blob>(KEY_DIGEST).await? else {
        return Ok(None);
    };

    let device = DeviceSnapshot {
        owner: required::<Option<Principal>, _>(store, KEY_OWNER).await?,
        buffer: required::<Blob, _>(store, KEY_BUFFER).await?.0,
        write_cursor: required(store, KEY_WRITE_CURSOR).await?,
        read_cursor: required(store, KEY_READ_CURSOR).await?,
        open_count: store
            .retrieve_u32(KEY_OPEN_COUNT)
            .await?
            .ok_or_else(|| StoreError::MissingField(KEY_OPEN_COUNT.to_string()))?,
        last_access_was_read: store
            .retrieve_bool(KEY_LAST_ACCESS_WAS_READ)
            .await?
            .ok_or_else(|| StoreError::MissingField(KEY_LAST_ACCESS_WAS_READ.to_string()))?,
    };
    let saved = SavedState {
        device,
        handles: required(store, KEY_HANDLES).await?,
    };

    let actual = saved.digest()?;
    if actual[..] != expected[..] {
        return Err(StoreError::DigestMismatch {
            expected: hex::encode(&expected),
            actual: hex::encode(actual),
        });
    }

    clear_snapshot(store).await?;
    tracing::info!(digest = %hex::encode(actual), "device state restored");
    Ok(Some(saved))
}

/// Delete every snapshot key.
pub async fn clear_snapshot<S: StateStore + ?Sized>(store: &S) -> Result<()> {
    for key in SNAPSHOT_KEYS {
        store.delete(key).await?;
    }
    Ok(())
}

async fn required<T, S>(store: &S, key: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    S: StateStore + ?Sized,
{
    store
        .retrieve_value(key)
        .await?
        .ok_or_else(|| StoreError::MissingField(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::sqlite::SqliteStore;
    use crate::traits::StateStore;
    use secret_driver_core::{AccessPolicy, DeviceState, SECRET_CAPACITY};

    fn saved() -> SavedState {
        let mut state = DeviceState::new();
        state.open(Principal::new(1000), AccessMode::WriteOnly).unwrap();
        state.write(b"hello world");
        state.open(Principal::new(1000), AccessMode::ReadOnly).unwrap();
        state.read(6);
        SavedState {
            device: state.snapshot(),
            handles: vec![
                OpenHandle {
                    holder: 7,
                    mode: AccessMode::WriteOnly,
                },
                OpenHandle {
                    holder: 7,
                    mode: AccessMode::ReadOnly,
                },
            ],
        }
    }

    async fn roundtrip<S: StateStore>(store: &S) {
        let saved = saved();
        save_snapshot(store, &saved).await.unwrap();

        let restored = restore_snapshot(store).await.unwrap().unwrap();
        assert_eq!(restored, saved);

        let state =
            DeviceState::restore(restored.device, SECRET_CAPACITY, AccessPolicy::default())
                .unwrap();
        assert_eq!(state.open_count(), 2);
        assert_eq!(state.buffer().readable(), 5);

        // Consumed.
        assert!(store.keys().await.unwrap().is_empty());
        assert!(restore_snapshot(store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roundtrip_memory() {
        roundtrip(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_roundtrip_sqlite() {
        roundtrip(&SqliteStore::open_memory().unwrap()).await;
    }

    #[tokio::test]
    async fn test_nothing_saved() {
        let store = MemoryStore::new();
        assert!(restore_snapshot(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_are_field_names() {
        let store = MemoryStore::new();
        save_snapshot(&store, &saved()).await.unwrap();

        let mut expected: Vec<String> = SNAPSHOT_KEYS.iter().map(|k| k.to_string()).collect();
        expected.sort();
        assert_eq!(store.keys().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_tampered_field_detected() {
        let store = MemoryStore::new();
        save_snapshot(&store, &saved()).await.unwrap();
        store.publish_u32(KEY_OPEN_COUNT, 9).await.unwrap();

        let err = restore_snapshot(&store).await.unwrap_err();
        assert!(matches!(err, StoreError::DigestMismatch { .. }));
        // Left in place for inspection.
        assert!(store.retrieve(KEY_DIGEST).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tampered_handles_detected() {
        let store = MemoryStore::new();
        save_snapshot(&store, &saved()).await.unwrap();
        let moved = vec![OpenHandle {
            holder: 666,
            mode: AccessMode::ReadOnly,
        }];
        store.publish_value(KEY_HANDLES, &moved).await.unwrap();

        let err = restore_snapshot(&store).await.unwrap_err();
        assert!(matches!(err, StoreError::DigestMismatch { .. }));
    }

    #[tokio::test]
    async fn test_missing_field_detected() {
        let store = MemoryStore::new();
        save_snapshot(&store, &saved()).await.unwrap();
        store.delete(KEY_BUFFER).await.unwrap();

        let err = restore_snapshot(&store).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingField(ref k) if k == KEY_BUFFER));
    }
}
