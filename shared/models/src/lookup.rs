//! Lookup keys and response bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MESSAGE_CACHE: &str = "cache";
pub const MESSAGE_FETCHED: &str = "fetch successfully";
pub const MESSAGE_FALLBACK: &str = "result is none, return original name";

/// Identifier namespace, also the cache key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    Iupac,
    Chebi,
}

impl IdentifierKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Iupac => "IUPAC",
            Self::Chebi => "CHEBI",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Cache key: identifier kind plus the trimmed input name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    kind: IdentifierKind,
    name: String,
}

impl LookupKey {
    pub const SEPARATOR: char = ':';

    pub fn new(kind: IdentifierKind, name: &str) -> Self {
        Self {
            kind,
            name: normalize_name(name).to_string(),
        }
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte-string form stored in the key-value store, e.g. `IUPAC:aspirin`.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}{}{}", self.kind.tag(), Self::SEPARATOR, self.name).into_bytes()
    }
}

/// Leading and trailing whitespace removed; applied on both read and write.
pub fn normalize_name(name: &str) -> &str {
    name.trim()
}

/// `{"data": ..., "message": ...}` body returned by both resolvers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub data: String,
    pub message: String,
}

impl LookupResult {
    pub fn cached(value: String) -> Self {
        Self {
            data: value,
            message: MESSAGE_CACHE.to_string(),
        }
    }

    pub fn fetched(value: String) -> Self {
        Self {
            data: value,
            message: MESSAGE_FETCHED.to_string(),
        }
    }

    /// Original input handed back unchanged.
    pub fn fallback(original: &str) -> Self {
        Self {
            data: original.to_string(),
            message: MESSAGE_FALLBACK.to_string(),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.message == MESSAGE_CACHE
    }
}
