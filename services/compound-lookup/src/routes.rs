use axum::{
    extract::{Query, State},
    http::{
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_TYPE},
        HeaderValue, StatusCode, Uri,
    },
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chemid_database::KeyValueStore;
use chemid_models::LookupResult;
use chemid_utils::{ChemIdError, ErrorResponse, ServerConfig};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::metrics;
use crate::middleware::request_id_middleware;
use crate::service::IdentifierService;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const EXPOSED_HEADERS: &str = "Request-Context,api-supported-versions,Content-Length,Date,Server";
const NO_NAME: &str = "no name or space";
/// Headroom over the lookup deadline so the resolver answers before the
/// layer timeout fires.
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

type QueryPairs = Query<Vec<(String, String)>>;

#[derive(Clone)]
pub struct AppState {
    pub service: IdentifierService,
}

pub fn create_app(state: AppState, config: &ServerConfig) -> Router {
    let json_routes = Router::new()
        .route("/iupac", get(iupac))
        .route("/chebi", get(chebi))
        .route("/clear", get(clear))
        .route("/health", get(health_check))
        .fallback(unknown_path)
        .layer(SetResponseHeaderLayer::overriding(
            CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        ));

    Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(json_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::overriding(
                    ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    ACCESS_CONTROL_EXPOSE_HEADERS,
                    HeaderValue::from_static(EXPOSED_HEADERS),
                ))
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(config.timeout() + TIMEOUT_GRACE)),
        )
        .with_state(state)
}

/// Boundary error rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub ChemIdError);

impl From<ChemIdError> for ApiError {
    fn from(error: ChemIdError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &self.0 {
            ChemIdError::Validation { message, .. } | ChemIdError::Authentication { message } => message.clone(),
            ChemIdError::NotFound { resource } => format!("path '{}' error", resource),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// `name` and `auth` query parameters. Repeated keys keep their first value.
#[derive(Debug, Default)]
pub struct NameQuery {
    pub name: Option<String>,
    pub auth: Option<String>,
}

impl NameQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "name" if query.name.is_none() => query.name = Some(value),
                "auth" if query.auth.is_none() => query.auth = Some(value),
                _ => {}
            }
        }
        query
    }

    fn required_name(&self) -> Result<&str, ApiError> {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(ChemIdError::validation("name", NO_NAME).into()),
        }
    }
}

fn query_or_default(query: Option<QueryPairs>) -> NameQuery {
    query.map(|Query(pairs)| NameQuery::from_pairs(pairs)).unwrap_or_default()
}

async fn iupac(
    State(state): State<AppState>,
    query: Option<QueryPairs>,
) -> Result<Json<LookupResult>, ApiError> {
    let query = query_or_default(query);
    let name = query.required_name()?;
    Ok(Json(state.service.resolve_iupac(name).await))
}

async fn chebi(
    State(state): State<AppState>,
    query: Option<QueryPairs>,
) -> Result<Json<LookupResult>, ApiError> {
    let query = query_or_default(query);
    let name = query.required_name()?;
    Ok(Json(state.service.resolve_chebi(name).await))
}

async fn clear(
    State(state): State<AppState>,
    query: Option<QueryPairs>,
) -> Result<Json<Value>, ApiError> {
    let query = query_or_default(query);
    let prefix = query.required_name()?;
    state.service.clear(prefix, query.auth.as_deref()).await?;
    Ok(Json(json!({ "message": format!("KV {} cleared", prefix) })))
}

async fn unknown_path(uri: Uri) -> ApiError {
    ChemIdError::not_found(uri.path()).into()
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let store = state.service.cache().store();
    let cache_status = match store.health_check().await {
        Ok(_) => json!({"status": "healthy", "backend": store.backend()}),
        Err(e) => json!({"status": "unhealthy", "backend": store.backend(), "message": e.to_string()}),
    };
    let healthy = cache_status["status"] == "healthy";

    Json(json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "chemid-compound-lookup",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": { "cache": cache_status }
    }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, HeaderValue::from_static("text/plain; version=0.0.4"))],
        metrics::render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chemid_database::MemoryStore;
    use chemid_utils::AppConfig;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::middleware::REQUEST_ID_HEADER;

    fn test_config(remote: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.pubchem.base_url = remote.to_string();
        config.pubchem.timeout_seconds = 2;
        config.annotation.base_url = format!("{}/annotate", remote);
        config.annotation.timeout_seconds = 2;
        config.admin.clear_secret = Some("s3cret".to_string());
        config
    }

    fn app_with(config: &AppConfig, store: MemoryStore) -> Router {
        let service = IdentifierService::new(config, Arc::new(store)).unwrap();
        create_app(AppState { service }, &config.server)
    }

    fn app(store: MemoryStore) -> Router {
        // Nothing listens here; remote lookups fail fast
        app_with(&test_config("http://127.0.0.1:9"), store)
    }

    async fn send_get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    #[tokio::test]
    async fn missing_name_is_rejected() {
        let (status, headers, body) = send_get(app(MemoryStore::new()), "/iupac").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "no name or space"}));
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_EXPOSE_HEADERS], EXPOSED_HEADERS);
        assert!(headers.contains_key(REQUEST_ID_HEADER));

        let (status, _, _) = send_get(app(MemoryStore::new()), "/chebi?name=%20%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (status, headers, body) = send_get(app(MemoryStore::new()), "/smiles?name=aspirin").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "path '/smiles' error"}));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn iupac_served_from_cache() {
        let store = MemoryStore::new();
        store.set(b"IUPAC:aspirin", b"2-acetyloxybenzoic acid").await.unwrap();

        let (status, headers, body) = send_get(app(store), "/iupac?name=%20aspirin%20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"data": "2-acetyloxybenzoic acid", "message": "cache"}));
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn unreachable_remote_returns_original_name() {
        let (status, _, body) = send_get(app(MemoryStore::new()), "/chebi?name=aspirin").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"data": "aspirin", "message": "result is none, return original name"})
        );
    }

    #[tokio::test]
    async fn slow_remote_still_answers_with_fallback() {
        let mut server = mockito::Server::new_async().await;
        let waiting = json!({"Waiting": {"ListKey": "1"}}).to_string();
        let _search = server
            .mock("GET", "/name/aspirin/JSON")
            .with_status(202)
            .with_body(waiting.clone())
            .create_async()
            .await;
        let _poll = server
            .mock("GET", "/listkey/1/JSON")
            .with_status(202)
            .with_body(waiting)
            .create_async()
            .await;

        let mut config = test_config(&server.url());
        config.pubchem.poll_interval_ms = 400;
        config.pubchem.max_polls = 3;
        config.server.timeout_seconds = 2;

        let (status, headers, body) = send_get(app_with(&config, MemoryStore::new()), "/iupac?name=aspirin").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(
            body,
            json!({"data": "aspirin", "message": "result is none, return original name"})
        );
    }

    #[tokio::test]
    async fn repeated_name_uses_first_value() {
        let store = MemoryStore::new();
        store.set(b"IUPAC:aspirin", b"2-acetyloxybenzoic acid").await.unwrap();

        let (status, _, body) = send_get(app(store), "/iupac?name=aspirin&name=ibuprofen").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"data": "2-acetyloxybenzoic acid", "message": "cache"}));
    }

    #[test]
    fn query_pairs_keep_first_value() {
        let query = NameQuery::from_pairs(vec![
            ("auth".to_string(), "s3cret".to_string()),
            ("name".to_string(), "IUPAC".to_string()),
            ("name".to_string(), "CHEBI".to_string()),
            ("auth".to_string(), "other".to_string()),
            ("extra".to_string(), "ignored".to_string()),
        ]);
        assert_eq!(query.name.as_deref(), Some("IUPAC"));
        assert_eq!(query.auth.as_deref(), Some("s3cret"));
        assert!(NameQuery::from_pairs(Vec::new()).required_name().is_err());
    }

    #[tokio::test]
    async fn clear_requires_secret() {
        let store = MemoryStore::new();
        store.set(b"IUPAC:aspirin", b"v").await.unwrap();
        store.set(b"CHEBI:aspirin", b"v").await.unwrap();

        let (status, _, body) = send_get(app(store.clone()), "/clear?name=IUPAC&auth=nope").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "invalid auth"}));
        assert_eq!(store.len().await, 2);

        let (status, _, body) = send_get(app(store.clone()), "/clear?auth=s3cret&name=IUPAC").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "KV IUPAC cleared"}));
        assert!(store.get(b"IUPAC:aspirin").await.unwrap().is_none());
        assert!(store.get(b"CHEBI:aspirin").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn health_reports_cache_backend() {
        let (status, _, body) = send_get(app(MemoryStore::new()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["cache"]["backend"], "memory");
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let _ = send_get(app(MemoryStore::new()), "/chebi?name=water").await;
        let response = app(MemoryStore::new())
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; version=0.0.4");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("chemid_lookups_total"));
    }
}
