use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ChemIdError {
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Decode error: {service} - {message}")]
    Decode { service: String, message: String },

    #[error("Polling gave up after {attempts} follow-up requests")]
    PollTimeout { attempts: u32 },

    #[error("Ambiguous ChEBI tag: {matches:?}")]
    AmbiguousTag { matches: Vec<String> },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },
}

impl ChemIdError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn decode(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::PollTimeout { .. } => "POLL_TIMEOUT",
            Self::AmbiguousTag { .. } => "AMBIGUOUS_TAG",
            Self::Cache { .. } => "CACHE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Authentication { .. } => 401,
            Self::ExternalService { .. } => 502,
            Self::Decode { .. } => 502,
            Self::PollTimeout { .. } => 504,
            Self::AmbiguousTag { .. } => 502,
            Self::Cache { .. } => 500,
            Self::Configuration { .. } => 500,
            Self::NotFound { .. } => 404,
        }
    }

    /// Failures caused by a remote service rather than by local setup.
    /// Fail-soft clients log these at `warn` and anything else at `error`.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::ExternalService { .. }
                | Self::Decode { .. }
                | Self::PollTimeout { .. }
                | Self::AmbiguousTag { .. }
        )
    }
}

pub type ChemIdResult<T> = Result<T, ChemIdError>;

/// `{"error": "..."}` body returned at the HTTP boundary.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

impl From<redis::RedisError> for ChemIdError {
    fn from(error: redis::RedisError) -> Self {
        Self::cache(error.to_string())
    }
}

impl From<reqwest::Error> for ChemIdError {
    fn from(error: reqwest::Error) -> Self {
        let service = error
            .url()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "HTTP Client".to_string());
        Self::external_service(service, error.to_string())
    }
}

impl From<serde_json::Error> for ChemIdError {
    fn from(error: serde_json::Error) -> Self {
        Self::decode("JSON", error.to_string())
    }
}
