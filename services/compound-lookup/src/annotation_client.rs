//! ZOOMA Annotation Client
//!
//! Single-shot annotate request restricted to the ChEBI ontology.

use chemid_models::{extract_chebi_tag, Annotation, TagMatch};
use chemid_utils::{AnnotationConfig, ChemIdError, ChemIdResult};
use reqwest::Client;
use tracing::{debug, error, warn};

const CHEBI_FILTER: &str = "required:[chebi],preferred:[chebi]";

pub struct AnnotationClient {
    client: Client,
    base_url: String,
}

impl AnnotationClient {
    pub fn new(config: &AnnotationConfig) -> ChemIdResult<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Fetch annotations for the raw property value.
    pub async fn annotate(&self, property_value: &str) -> ChemIdResult<Vec<Annotation>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("propertyValue", property_value), ("filter", CHEBI_FILTER)])
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ChemIdError::decode("ZOOMA", e.to_string()))
    }

    /// The single `CHEBI_<digits>` tag for `property_value`, if any.
    ///
    /// More than one tag in the selected semantic tag is an
    /// [`ChemIdError::AmbiguousTag`].
    pub async fn chebi_tag(&self, property_value: &str) -> ChemIdResult<Option<String>> {
        let annotations = self.annotate(property_value).await?;
        debug!(count = annotations.len(), property_value, "ZOOMA annotations received");

        match extract_chebi_tag(&annotations) {
            TagMatch::None => Ok(None),
            TagMatch::Single(tag) => Ok(Some(tag)),
            TagMatch::Multiple(matches) => Err(ChemIdError::AmbiguousTag { matches }),
        }
    }

    /// Fail-soft variant of [`Self::chebi_tag`].
    pub async fn lookup(&self, property_value: &str) -> Option<String> {
        match self.chebi_tag(property_value).await {
            Ok(tag) => tag,
            Err(e) if e.is_remote() => {
                warn!(error = %e, code = e.error_code(), url = %self.base_url, property_value, "ChEBI annotation failed");
                None
            }
            Err(e) => {
                error!(error = %e, code = e.error_code(), url = %self.base_url, property_value, "ChEBI annotation failed");
                None
            }
        }
    }
}
