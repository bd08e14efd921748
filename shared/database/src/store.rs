//! Key-Value Store
//!
//! Byte-string persistence used by the lookup cache.

use anyhow::Result;
use async_trait::async_trait;

/// Durable key-value mapping. Implementations must tolerate concurrent
/// callers.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &[u8]) -> Result<bool>;

    /// All keys starting with `prefix`, in no particular order.
    async fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Delete every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &[u8]) -> Result<usize> {
        let mut removed = 0;
        for key in self.list_prefix(prefix).await? {
            if self.delete(&key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
