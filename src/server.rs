//! # HTTP Server
//!
//! Local HTTP front end for the cache, plus metrics and probes.
//!
//! Provides endpoints:
//! - `/secretsmanager/get` - Secret lookup (`secretId`, optional `versionId` / `versionStage`)
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness probe (always returns 200)
//! - `/readyz` - Readiness probe (returns 200 once the cache is ready)
//!
//! The server runs on port 2773 by default.

use crate::client::SecretsManagerCache;
use crate::error::Error;
use crate::observability::metrics;
use crate::types::GetSecretOptions;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct ServerState {
    pub cache: SecretsManagerCache,
    pub is_ready: Arc<AtomicBool>,
}

impl ServerState {
    #[must_use]
    pub fn new(cache: SecretsManagerCache) -> Self {
        Self {
            cache,
            is_ready: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetSecretQuery {
    secret_id: Option<String>,
    version_id: Option<String>,
    version_stage: Option<String>,
}

#[must_use]
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/secretsmanager/get", get(get_secret_handler))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, state: Arc<ServerState>) -> Result<(), anyhow::Error> {
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_secret_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<GetSecretQuery>,
) -> Response {
    let Some(secret_id) = query.secret_id.filter(|id| !id.is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "InvalidParameterException",
            "secretId is required",
        );
    };
    let options = GetSecretOptions {
        version_id: query.version_id,
        version_stage: query.version_stage,
    };

    match state.cache.get_secret_value(&secret_id, &options).await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                warn!(secret_id = %secret_id, error = %e, "Secret lookup failed");
            }
            error_response(status, e.code(), &e.to_string())
        }
    }
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        Error::Backend(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "__type": code,
            "message": message,
        })),
    )
        .into_response()
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = metrics::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.is_ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::provider::InMemoryBackend;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(backend: InMemoryBackend) -> Arc<ServerState> {
        let cache = SecretsManagerCache::new(Arc::new(backend), CacheConfig::default()).unwrap();
        Arc::new(ServerState::new(cache))
    }

    async fn get_json(state: Arc<ServerState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_get_secret_returns_payload() {
        let backend = InMemoryBackend::new();
        let version_id = backend.put_secret_string("db", "hunter2");

        let (status, body) = get_json(test_state(backend), "/secretsmanager/get?secretId=db").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Name"], "db");
        assert_eq!(body["VersionId"], version_id);
        assert_eq!(body["SecretString"], "hunter2");
    }

    #[tokio::test]
    async fn test_get_secret_by_stage() {
        let backend = InMemoryBackend::new();
        backend.put_secret_string("db", "old");
        backend.put_secret_string("db", "new");

        let (status, body) = get_json(
            test_state(backend),
            "/secretsmanager/get?secretId=db&versionStage=AWSPREVIOUS",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["SecretString"], "old");
    }

    #[tokio::test]
    async fn test_unknown_secret_is_404() {
        let (status, body) = get_json(
            test_state(InMemoryBackend::new()),
            "/secretsmanager/get?secretId=missing",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["__type"], "ResourceNotFoundException");
    }

    #[tokio::test]
    async fn test_missing_secret_id_is_400() {
        let (status, _) =
            get_json(test_state(InMemoryBackend::new()), "/secretsmanager/get").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_backend_error_is_502() {
        let backend = InMemoryBackend::new();
        backend.put_secret_string("db", "hunter2");
        backend.fail_next_describe("throttled");

        let (status, body) =
            get_json(test_state(backend), "/secretsmanager/get?secretId=db").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["__type"], "BackendError");
    }

    #[tokio::test]
    async fn test_readyz_follows_flag() {
        let state = test_state(InMemoryBackend::new());
        let request = || Request::builder().uri("/readyz").body(Body::empty()).unwrap();

        let response = router(Arc::clone(&state)).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.is_ready.store(true, Ordering::Relaxed);
        let response = router(state).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        metrics::register_metrics().unwrap();
        let response = router(test_state(InMemoryBackend::new()))
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("secrets_cache_"));
    }
}
