pub mod memory;
pub mod redis;
pub mod store;

pub use memory::MemoryStore;
pub use self::redis::{create_redis_pool, RedisPool, RedisStore};
pub use store::KeyValueStore;
