use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};

use crate::store::KeyValueStore;

pub type RedisPool = ConnectionManager;

pub async fn create_redis_pool(redis_url: &str) -> Result<RedisPool> {
    let client = Client::open(redis_url)?;
    let connection_manager = ConnectionManager::new(client).await?;

    tracing::info!("Connected to Redis cache");
    Ok(connection_manager)
}

pub async fn health_check(pool: &mut RedisPool) -> Result<()> {
    let _: String = redis::cmd("PING")
        .query_async(pool)
        .await
        .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))?;
    Ok(())
}

/// Redis-backed store. Every key is stored under `namespace`.
#[derive(Clone)]
pub struct RedisStore {
    pool: RedisPool,
    namespace: Vec<u8>,
}

impl RedisStore {
    pub fn new(pool: RedisPool, namespace: impl Into<Vec<u8>>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    pub async fn connect(redis_url: &str, namespace: impl Into<Vec<u8>>) -> Result<Self> {
        let pool = create_redis_pool(redis_url).await?;
        Ok(Self::new(pool, namespace))
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.namespace.len() + key.len());
        full.extend_from_slice(&self.namespace);
        full.extend_from_slice(key);
        full
    }

    fn scan_pattern(&self, prefix: &[u8]) -> Vec<u8> {
        let mut pattern = escape_glob(&self.namespace);
        pattern.extend(escape_glob(prefix));
        pattern.push(b'*');
        pattern
    }
}

/// Escape Redis glob metacharacters so a prefix matches literally.
pub fn escape_glob(raw: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(raw.len());
    for &byte in raw {
        if matches!(byte, b'*' | b'?' | b'[' | b']' | b'\\') {
            escaped.push(b'\\');
        }
        escaped.push(byte);
    }
    escaped
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut con = self.pool.clone();
        let value: Option<Vec<u8>> = con
            .get(self.full_key(key))
            .await
            .context("Failed to read cache entry")?;
        Ok(value)
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut con = self.pool.clone();
        let _: () = con
            .set(self.full_key(key), value)
            .await
            .context("Failed to write cache entry")?;
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut con = self.pool.clone();
        let removed: i64 = con
            .del(self.full_key(key))
            .await
            .context("Failed to delete cache entry")?;
        Ok(removed > 0)
    }

    async fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut con = self.pool.clone();
        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<'_, Vec<u8>> = con
                .scan_match(self.scan_pattern(prefix))
                .await
                .context("Failed to scan cache keys")?;
            while let Some(key) = iter.next_item().await {
                if let Some(stripped) = key.strip_prefix(self.namespace.as_slice()) {
                    keys.push(stripped.to_vec());
                }
            }
        }
        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn health_check(&self) -> Result<()> {
        let mut con = self.pool.clone();
        health_check(&mut con).await
    }
}
