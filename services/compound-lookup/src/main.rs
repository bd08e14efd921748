//! ChemID Compound Lookup Service
//!
//! Resolves compound names to preferred IUPAC names (PubChem) and ChEBI
//! ontology tags (ZOOMA), caching every successful answer.

use anyhow::{Context, Result};
use chemid_database::{KeyValueStore, MemoryStore, RedisStore};
use chemid_utils::{init_logging, AppConfig, CacheBackend, CacheConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod annotation_client;
mod cache;
mod metrics;
mod middleware;
mod pubchem_client;
mod routes;
mod service;

use routes::AppState;
use service::IdentifierService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting ChemID Compound Lookup Service");

    let store = create_store(&config.cache).await?;
    info!(backend = store.backend(), "Cache store ready");

    let service = IdentifierService::new(&config, store)?;
    let app = routes::create_app(AppState { service }, &config.server);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server host/port")?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Compound Lookup Service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn create_store(config: &CacheConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        CacheBackend::Redis => {
            let store = RedisStore::connect(&config.redis_url, config.namespace.clone())
                .await
                .context("Failed to connect to Redis cache")?;
            Ok(Arc::new(store))
        }
        CacheBackend::Memory => {
            warn!("Using in-memory cache; entries are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
