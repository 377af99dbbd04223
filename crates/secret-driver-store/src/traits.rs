//! StateStore trait: the host's key/value store for live-update state.
//!
//! A driver about to be replaced publishes its state here, keyed by field
//! name. Its successor retrieves and deletes the same keys on startup.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Async key/value interface exposed by the host.
///
/// # Design Notes
///
/// - **Overwrite on publish**: publishing an existing key replaces its value.
/// - **Opaque values**: the store holds bytes; typed access lives in
///   [`StateStoreExt`].
/// - **Missing keys**: `retrieve` returns `None`, `delete` is a no-op.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Publish a value under `key`, replacing any previous value.
    async fn publish(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve the value under `key`.
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete the value under `key`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all published keys in ascending order.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Typed helpers over [`StateStore`]. Values are CBOR-encoded.
pub trait StateStoreExt: StateStore {
    /// Publish a serializable value.
    fn publish_value<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Retrieve and decode a value.
    fn retrieve_value<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<T>>> + Send;

    /// Publish a `u32`.
    fn publish_u32(
        &self,
        key: &str,
        value: u32,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Retrieve a `u32`.
    fn retrieve_u32(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<u32>>> + Send;

    /// Publish a `bool`.
    fn publish_bool(
        &self,
        key: &str,
        value: bool,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Retrieve a `bool`.
    fn retrieve_bool(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<bool>>> + Send;
}

impl<S: StateStore + ?Sized> StateStoreExt for S {
    async fn publish_value<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = encode(value)?;
        self.publish(key, &bytes).await
    }

    async fn retrieve_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.retrieve(key).await? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn publish_u32(&self, key: &str, value: u32) -> Result<()> {
        self.publish_value(key, &value).await
    }

    async fn retrieve_u32(&self, key: &str) -> Result<Option<u32>> {
        self.retrieve_value(key).await
    }

    async fn publish_bool(&self, key: &str, value: bool) -> Result<()> {
        self.publish_value(key, &value).await
    }

    async fn retrieve_bool(&self, key: &str) -> Result<Option<bool>> {
        self.retrieve_value(key).await
    }
}

/// CBOR-encode a value.
pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Decode a CBOR value.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}
