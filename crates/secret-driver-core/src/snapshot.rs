//! Snapshots of the Device State for live update.
//!
//! A snapshot captures every field a successor process needs to resume with
//! bit-identical state. It is encoded as CBOR and identified by the BLAKE3
//! digest of that encoding.

use serde::{Deserialize, Serialize};

use crate::buffer::TransferBuffer;
use crate::error::{CoreError, Result};
use crate::policy::AccessPolicy;
use crate::state::DeviceState;
use crate::types::Principal;

/// The complete, transferable Device State.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub owner: Option<Principal>,
    #[serde(with = "byte_string")]
    pub buffer: Vec<u8>,
    pub write_cursor: u64,
    pub read_cursor: u64,
    pub open_count: u32,
    pub last_access_was_read: bool,
}

impl DeviceSnapshot {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    /// BLAKE3 digest of the CBOR encoding.
    pub fn digest(&self) -> Result<[u8; 32]> {
        Ok(*blake3::hash(&self.to_bytes()?).as_bytes())
    }

}

impl std::fmt::Debug for DeviceSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSnapshot")
            .field("owner", &self.owner)
            .field("capacity", &self.buffer.len())
            .field("write_cursor", &self.write_cursor)
            .field("read_cursor", &self.read_cursor)
            .field("open_count", &self.open_count)
            .field("last_access_was_read", &self.last_access_was_read)
            .finish()
    }
}

impl DeviceState {
    /// Capture the full state.
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            owner: self.owner,
            buffer: self.buffer.as_bytes().to_vec(),
            write_cursor: self.buffer.write_cursor() as u64,
            read_cursor: self.buffer.read_cursor() as u64,
            open_count: self.open_count,
            last_access_was_read: self.last_access_was_read,
        }
    }

    /// Rebuild a device from a snapshot.
    ///
    /// The snapshot's buffer must match `capacity` and its cursors must be
    /// ordered. An unowned snapshot must be at the wiped baseline. An owned
    /// snapshot with no open handles must not carry the read flag, since the
    /// last close would have wiped it.
    pub fn restore(
        snapshot: DeviceSnapshot,
        capacity: usize,
        policy: AccessPolicy,
    ) -> Result<Self> {
        if snapshot.buffer.len() != capacity {
            return Err(CoreError::InvalidSnapshot(format!(
                "buffer is {} bytes, expected {}",
                snapshot.buffer.len(),
                capacity
            )));
        }

        let write_cursor = usize::try_from(snapshot.write_cursor)
            .map_err(|_| CoreError::InvalidSnapshot("write cursor out of range".into()))?;
        let read_cursor = usize::try_from(snapshot.read_cursor)
            .map_err(|_| CoreError::InvalidSnapshot("read cursor out of range".into()))?;

        let buffer = TransferBuffer::from_parts(snapshot.buffer, write_cursor, read_cursor)
            .ok_or_else(|| {
                CoreError::InvalidSnapshot(format!(
                    "cursors out of order: read {} write {} capacity {}",
                    read_cursor, write_cursor, capacity
                ))
            })?;

        let state = Self {
            owner: snapshot.owner,
            buffer,
            open_count: snapshot.open_count,
            last_access_was_read: snapshot.last_access_was_read,
            policy,
        };

        if state.owner.is_none() && !state.is_baseline() {
            return Err(CoreError::InvalidSnapshot(
                "unowned snapshot carries residual state".into(),
            ));
        }
        if state.owner.is_some() && state.open_count == 0 && state.last_access_was_read {
            return Err(CoreError::InvalidSnapshot(
                "idle snapshot was read but never wiped".into(),
            ));
        }

        Ok(state)
    }
}

/// Serde adapter encoding a `Vec<u8>` as a CBOR byte string rather than an
/// array of integers. Use with `#[serde(with = "...")]`.
pub mod byte_string {
    use serde::de::{Deserializer, Error, SeqAccess, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = Vec<u8>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a byte string")
            }

            fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(v.to_vec())
            }

            fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(v)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(b) = seq.next_element::<u8>()? {
                    out.push(b);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_byte_buf(BytesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessMode, SECRET_CAPACITY};

    const ALICE: Principal = Principal::new(1000);

    fn populated() -> DeviceState {
        let mut state = DeviceState::new();
        state.open(ALICE, AccessMode::WriteOnly).unwrap();
        state.write(b"hello world");
        state.open(ALICE, AccessMode::ReadOnly).unwrap();
        state.read(5);
        state
    }

    #[test]
    fn test_snapshot_restore_identical() {
        let state = populated();
        let snapshot = state.snapshot();

        let restored =
            DeviceState::restore(snapshot.clone(), SECRET_CAPACITY, AccessPolicy::default())
                .unwrap();

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.owner(), Some(ALICE));
        assert_eq!(restored.open_count(), 2);
        assert_eq!(restored.buffer().read_cursor(), 5);
        assert_eq!(restored.buffer().write_cursor(), 11);
    }

    #[test]
    fn test_snapshot_cbor_encoding() {
        let snapshot = populated().snapshot();
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(DeviceSnapshot::from_bytes(&bytes).unwrap(), snapshot);
        // Byte string encoding keeps the buffer near its raw size.
        assert!(bytes.len() < SECRET_CAPACITY + 128);
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = populated().snapshot();
        let mut b = a.clone();
        b.buffer[0] ^= 0xff;
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn test_restore_rejects_wrong_capacity() {
        let snapshot = populated().snapshot();
        let err = DeviceState::restore(snapshot, 16, AccessPolicy::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_restore_rejects_disordered_cursors() {
        let mut snapshot = populated().snapshot();
        snapshot.read_cursor = 12;
        assert!(DeviceState::restore(snapshot, SECRET_CAPACITY, AccessPolicy::default()).is_err());
    }

    #[test]
    fn test_restore_rejects_residual_unowned() {
        let mut snapshot = populated().snapshot();
        snapshot.owner = None;
        assert!(DeviceState::restore(snapshot, SECRET_CAPACITY, AccessPolicy::default()).is_err());
    }

    #[test]
    fn test_restore_rejects_idle_read_flag() {
        let mut state = DeviceState::new();
        state.open(ALICE, AccessMode::WriteOnly).unwrap();
        state.write(b"x");
        state.close();

        let mut snapshot = state.snapshot();
        assert!(
            DeviceState::restore(snapshot.clone(), SECRET_CAPACITY, AccessPolicy::default())
                .is_ok()
        );

        snapshot.last_access_was_read = true;
        let err =
            DeviceState::restore(snapshot, SECRET_CAPACITY, AccessPolicy::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_debug_hides_buffer() {
        let snapshot = populated().snapshot();
        let debug = format!("{:?}", snapshot);
        assert!(!debug.contains("104, 101"));
        assert!(debug.contains("capacity"));
    }
}
