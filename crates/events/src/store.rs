//! Key/value store trait and implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Trait for durable unit state that survives between event invocations.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under a key.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a value, replacing any previous value for the key.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// List all keys in sorted order.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Read a key and deserialize it.
///
/// # Errors
///
/// Returns an error if the store fails or the stored value does not
/// deserialize into `T`.
pub async fn get_typed<T>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    store
        .get(key)
        .await?
        .map(|value| serde_json::from_value(value).map_err(|e| Error::serialization(key, e.to_string())))
        .transpose()
}

/// Serialize a value and store it under a key.
///
/// # Errors
///
/// Returns an error if serialization or the store fails.
pub async fn set_typed<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + Sync,
{
    let value = serde_json::to_value(value).map_err(|e| Error::serialization(key, e.to_string()))?;
    store.set(key, value).await
}

/// In-memory key/value store for testing.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryKeyValueStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// A wrapper that adds tracing to a key/value store.
///
/// Values are never logged; they may hold credentials.
pub struct TracingKeyValueStore<S: KeyValueStore> {
    inner: S,
}

impl<S: KeyValueStore> TracingKeyValueStore<S> {
    /// Create a new tracing store.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for TracingKeyValueStore<S> {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let result = self.inner.get(key).await;
        if let Ok(ref value) = result {
            tracing::trace!(key, present = value.is_some(), "Read key");
        }
        result
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        tracing::debug!(key, "Writing key");
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        tracing::debug!(key, "Removing key");
        self.inner.remove(key).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }
}
