//! Annotation-service (ZOOMA) wire models and ChEBI tag extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CHEBI_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"CHEBI_\d+").expect("valid ChEBI tag pattern"));

/// One entry of the annotate response array. Only the semantic tags are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default)]
    pub semantic_tags: Vec<String>,
}

/// Outcome of scanning a semantic tag for `CHEBI_<digits>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatch {
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl Annotation {
    pub fn mentions_chebi(&self) -> bool {
        self.semantic_tags.iter().any(|tag| tag.contains("CHEBI"))
    }
}

/// Scan a single semantic tag URI.
pub fn match_chebi_tags(tag: &str) -> TagMatch {
    let mut found: Vec<String> = CHEBI_TAG.find_iter(tag).map(|m| m.as_str().to_string()).collect();
    match found.len() {
        0 => TagMatch::None,
        1 => TagMatch::Single(found.remove(0)),
        _ => TagMatch::Multiple(found),
    }
}

/// Pick the first annotation mentioning ChEBI and scan its first tag.
pub fn extract_chebi_tag(annotations: &[Annotation]) -> TagMatch {
    annotations
        .iter()
        .find(|a| a.mentions_chebi())
        .and_then(|a| a.semantic_tags.first())
        .map(|tag| match_chebi_tags(tag))
        .unwrap_or(TagMatch::None)
}
