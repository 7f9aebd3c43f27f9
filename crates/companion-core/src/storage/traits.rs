//! Key-value store trait.

use async_trait::async_trait;

use crate::error::Result;

/// Persistent string key-value storage.
///
/// Values are opaque text (the config cache stores serialized JSON). Writes
/// replace the whole value for a key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Returns whether a value was present.
    async fn remove(&self, key: &str) -> Result<bool>;
}
