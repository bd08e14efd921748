//! Identifier Service
//!
//! Cache-first IUPAC and ChEBI resolution with write-through and a fallback
//! to the caller's input.

use chemid_database::KeyValueStore;
use chemid_models::{IdentifierKind, LookupKey, LookupResult};
use chemid_utils::{AppConfig, ChemIdError, ChemIdResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::annotation_client::AnnotationClient;
use crate::cache::IdentifierCache;
use crate::metrics;
use crate::pubchem_client::{PubChemClient, SearchNamespace};

/// Identifier lookup service
#[derive(Clone)]
pub struct IdentifierService {
    cache: IdentifierCache,
    pubchem: Arc<PubChemClient>,
    annotation: Arc<AnnotationClient>,
    lookup_timeout: Duration,
    clear_secret: Option<String>,
}

impl IdentifierService {
    pub fn new(config: &AppConfig, store: Arc<dyn KeyValueStore>) -> ChemIdResult<Self> {
        Ok(Self {
            cache: IdentifierCache::new(store),
            pubchem: Arc::new(PubChemClient::new(&config.pubchem)?),
            annotation: Arc::new(AnnotationClient::new(&config.annotation)?),
            lookup_timeout: config.server.timeout(),
            clear_secret: config.admin.clear_secret.clone(),
        })
    }

    pub fn cache(&self) -> &IdentifierCache {
        &self.cache
    }

    /// Resolve `name` to its preferred IUPAC name.
    pub async fn resolve_iupac(&self, name: &str) -> LookupResult {
        let key = LookupKey::new(IdentifierKind::Iupac, name);
        if let Some(hit) = self.cache.get(&key).await {
            metrics::record_lookup(IdentifierKind::Iupac.tag(), "cache");
            return LookupResult::cached(hit);
        }

        let candidate = self.within_deadline(&key, self.fetch_iupac(name)).await;
        self.respond(&key, name, candidate).await
    }

    async fn fetch_iupac(&self, name: &str) -> Option<String> {
        let mut compounds = self.pubchem.search(self.pubchem.namespace_for(name), name).await;
        if compounds.is_none() {
            // One retry, always by name
            compounds = self.pubchem.search(SearchNamespace::Name, name).await;
        }

        compounds
            .unwrap_or_default()
            .into_iter()
            .find_map(|compound| compound.iupac_name)
    }

    /// Resolve `name` to a `CHEBI_<digits>` tag.
    pub async fn resolve_chebi(&self, name: &str) -> LookupResult {
        let key = LookupKey::new(IdentifierKind::Chebi, name);
        if let Some(hit) = self.cache.get(&key).await {
            metrics::record_lookup(IdentifierKind::Chebi.tag(), "cache");
            return LookupResult::cached(hit);
        }

        let candidate = self.within_deadline(&key, self.annotation.lookup(name)).await;
        self.respond(&key, name, candidate).await
    }

    /// Remote resolution past the lookup deadline counts as no answer.
    async fn within_deadline<F>(&self, key: &LookupKey, fetch: F) -> Option<String>
    where
        F: Future<Output = Option<String>>,
    {
        match tokio::time::timeout(self.lookup_timeout, fetch).await {
            Ok(candidate) => candidate,
            Err(_) => {
                warn!(
                    kind = key.kind().tag(),
                    name = key.name(),
                    timeout = ?self.lookup_timeout,
                    "Remote lookup exceeded its deadline"
                );
                None
            }
        }
    }

    async fn respond(&self, key: &LookupKey, original: &str, candidate: Option<String>) -> LookupResult {
        let kind = key.kind().tag();
        match candidate {
            Some(value) => {
                if let Err(e) = self.cache.set(key, &value).await {
                    metrics::CACHE_WRITE_FAILURES.inc();
                    warn!(error = %e, kind, name = key.name(), "Failed to cache resolved identifier");
                }
                metrics::record_lookup(kind, "fetched");
                LookupResult::fetched(value)
            }
            None => {
                metrics::record_lookup(kind, "fallback");
                LookupResult::fallback(original)
            }
        }
    }

    /// Delete every cache entry under `prefix` when `auth` matches the
    /// configured secret.
    pub async fn clear(&self, prefix: &str, auth: Option<&str>) -> ChemIdResult<usize> {
        match (self.clear_secret.as_deref(), auth) {
            (Some(secret), Some(given)) if secret == given => {}
            (None, _) => return Err(ChemIdError::authentication("cache clearing is disabled")),
            _ => return Err(ChemIdError::authentication("invalid auth")),
        }

        let removed = self.cache.clear_prefix(prefix).await?;
        info!(prefix, removed, "Cache cleared");
        Ok(removed)
    }
}
