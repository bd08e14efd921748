//! PubChem API Client
//!
//! Compound search against PUG REST. Searches may answer with a `Waiting`
//! listkey instead of results; the client then polls the listkey endpoint at a
//! fixed interval until the envelope is terminal, the poll budget runs out or
//! the search deadline passes.

use chemid_models::{CompoundRecord, CompoundSummary, PollState, SearchEnvelope};
use chemid_utils::{ChemIdError, ChemIdResult, PubChemConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::metrics;

static FORMULA_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Z][a-z]?\d*)+$").expect("valid formula pattern"));

/// PUG REST input namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchNamespace {
    Name,
    Formula,
}

impl SearchNamespace {
    fn segment(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Formula => "formula",
        }
    }
}

impl fmt::Display for SearchNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Element symbols with optional counts, e.g. `C9H8O4` or `NaCl`.
pub fn looks_like_formula(input: &str) -> bool {
    FORMULA_SHAPE.is_match(input.trim())
}

/// PubChem compound-search client
pub struct PubChemClient {
    client: Client,
    base_url: Url,
    poll_interval: Duration,
    max_polls: u32,
    search_timeout: Duration,
    formula_search: bool,
}

impl PubChemClient {
    pub fn new(config: &PubChemConfig) -> ChemIdResult<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ChemIdError::configuration(format!("invalid PubChem base URL {}: {}", config.base_url, e))
        })?;

        Ok(Self {
            client,
            base_url,
            poll_interval: config.poll_interval(),
            max_polls: config.max_polls,
            search_timeout: config.search_timeout(),
            formula_search: config.formula_search,
        })
    }

    /// Namespace for the first search attempt.
    pub fn namespace_for(&self, query: &str) -> SearchNamespace {
        if self.formula_search && looks_like_formula(query) {
            SearchNamespace::Formula
        } else {
            SearchNamespace::Name
        }
    }

    /// `{base}/{namespace}/{query}/JSON` with the query percent-encoded as one
    /// path segment.
    pub fn search_url(&self, namespace: SearchNamespace, query: &str) -> ChemIdResult<Url> {
        self.endpoint(&[namespace.segment(), query, "JSON"])
    }

    fn listkey_url(&self, list_key: &str) -> ChemIdResult<Url> {
        self.endpoint(&["listkey", list_key, "JSON"])
    }

    fn endpoint(&self, segments: &[&str]) -> ChemIdResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ChemIdError::configuration("PubChem base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_envelope(&self, url: Url) -> ChemIdResult<SearchEnvelope> {
        debug!(%url, "Querying PubChem");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        // Error statuses still carry a JSON Fault body
        let status = response.status();
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ChemIdError::decode("PubChem", format!("HTTP {}: {}", status, e)))
    }

    /// Run a search, following `Waiting` listkeys until the answer is ready.
    ///
    /// `Ok(None)` means the final envelope held no `PC_Compounds` array. Both
    /// the poll count and the wall-clock deadline end in `PollTimeout`.
    pub async fn fetch_with_polling(&self, url: Url) -> ChemIdResult<Option<Vec<CompoundRecord>>> {
        let mut polls = 0;
        let outcome = tokio::time::timeout(self.search_timeout, self.poll_until_ready(url, &mut polls)).await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                debug!(attempts = polls, timeout = ?self.search_timeout, "PubChem search deadline passed");
                Err(ChemIdError::PollTimeout { attempts: polls })
            }
        }
    }

    async fn poll_until_ready(&self, url: Url, polls: &mut u32) -> ChemIdResult<Option<Vec<CompoundRecord>>> {
        let mut envelope = self.get_envelope(url).await?;

        loop {
            if let Some(fault) = &envelope.fault {
                debug!(code = %fault.code, message = %fault.message, "PubChem returned a fault");
            }

            match envelope.into_state() {
                PollState::Ready(records) => return Ok(records),
                PollState::Pending(list_key) => {
                    if *polls >= self.max_polls {
                        return Err(ChemIdError::PollTimeout { attempts: *polls });
                    }
                    *polls += 1;
                    debug!(%list_key, attempt = *polls, "PubChem search pending");

                    tokio::time::sleep(self.poll_interval).await;
                    metrics::POLL_REQUESTS.inc();
                    envelope = self.get_envelope(self.listkey_url(&list_key)?).await?;
                }
            }
        }
    }

    /// Fail-soft search: transport, decode and timeout errors are logged and
    /// reported as `None`, same as an empty answer.
    pub async fn search(&self, namespace: SearchNamespace, query: &str) -> Option<Vec<CompoundSummary>> {
        let result = match self.search_url(namespace, query) {
            Ok(url) => self.fetch_with_polling(url).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(records) => records.map(|records| records.iter().map(CompoundRecord::summary).collect()),
            Err(e) if e.is_remote() => {
                warn!(error = %e, code = e.error_code(), %namespace, query, "PubChem search failed");
                None
            }
            Err(e) => {
                error!(error = %e, code = e.error_code(), %namespace, query, "PubChem search failed");
                None
            }
        }
    }
}
