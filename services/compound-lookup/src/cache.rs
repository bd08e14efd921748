//! Identifier Cache
//!
//! Resolved identifiers keyed by `(kind, trimmed name)` over the injected
//! key-value store.

use chemid_database::KeyValueStore;
use chemid_models::LookupKey;
use chemid_utils::{ChemIdError, ChemIdResult};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct IdentifierCache {
    store: Arc<dyn KeyValueStore>,
}

impl IdentifierCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Cached value for `key`. Empty values and read failures count as misses.
    pub async fn get(&self, key: &LookupKey) -> Option<String> {
        match self.store.get(&key.to_bytes()).await {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(value) if !value.is_empty() => {
                    debug!(kind = %key.kind(), name = key.name(), "Cache hit");
                    Some(value)
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, kind = %key.kind(), name = key.name(), "Cached value is not UTF-8");
                    None
                }
            },
            Ok(None) => {
                debug!(kind = %key.kind(), name = key.name(), "Cache miss");
                None
            }
            Err(e) => {
                warn!(error = %e, backend = self.store.backend(), "Cache read failed");
                None
            }
        }
    }

    pub async fn set(&self, key: &LookupKey, value: &str) -> ChemIdResult<()> {
        self.store
            .set(&key.to_bytes(), value.as_bytes())
            .await
            .map_err(|e| ChemIdError::cache(e.to_string()))
    }

    /// Delete every entry whose stored key starts with `prefix`.
    pub async fn clear_prefix(&self, prefix: &str) -> ChemIdResult<usize> {
        self.store
            .delete_prefix(prefix.as_bytes())
            .await
            .map_err(|e| ChemIdError::cache(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemid_database::MemoryStore;
    use chemid_models::IdentifierKind;

    #[tokio::test]
    async fn test_round_trip_uses_trimmed_key() {
        let store = MemoryStore::new();
        let cache = IdentifierCache::new(Arc::new(store.clone()));

        let key = LookupKey::new(IdentifierKind::Iupac, " Aspirin ");
        cache.set(&key, "2-acetyloxybenzoic acid").await.unwrap();

        assert_eq!(
            store.get(b"IUPAC:Aspirin").await.unwrap(),
            Some(b"2-acetyloxybenzoic acid".to_vec())
        );
        let again = LookupKey::new(IdentifierKind::Iupac, "Aspirin");
        assert_eq!(cache.get(&again).await.as_deref(), Some("2-acetyloxybenzoic acid"));
    }

    #[tokio::test]
    async fn test_empty_value_is_miss() {
        let store = MemoryStore::new();
        store.set(b"CHEBI:water", b"").await.unwrap();
        let cache = IdentifierCache::new(Arc::new(store));

        assert!(cache.get(&LookupKey::new(IdentifierKind::Chebi, "water")).await.is_none());
    }
}
