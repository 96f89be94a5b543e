mod ingest;
mod logs;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use newsdesk_ingest::{IngestError, IngestService, MAX_LOG_LIMIT};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IngestService>,
    /// Age cutoff used when a purge request does not name one.
    pub default_max_age_hours: u32,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> usize {
    limit
        .and_then(|l| usize::try_from(l.max(1)).ok())
        .unwrap_or(50)
        .min(MAX_LOG_LIMIT)
}

pub(super) fn map_ingest_error(request_id: String, error: &IngestError) -> ApiError {
    match error {
        IngestError::InvalidRequest(message) => {
            ApiError::new(request_id, "validation_error", message.clone())
        }
        IngestError::Store(e) => {
            tracing::error!(error = %e, "article store failed");
            ApiError::new(request_id, "service_unavailable", "article store unavailable")
        }
        other => {
            tracing::error!(error = %other, "ingest request failed");
            ApiError::new(request_id, "internal_error", "ingest request failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/ingest", post(ingest::run_ingest))
        .route("/api/v1/purge-refresh", post(ingest::run_purge_refresh))
        .route("/api/v1/logs", get(logs::list_logs))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match state.service.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: article store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use newsdesk_ingest::{
        AdapterOutcome, Coordinator, HeuristicScorer, MemoryStore, Orchestrator,
        OrchestratorSettings, Pipeline, RawItem, SourceAdapter, SourceDescriptor,
    };
    use tower::ServiceExt;

    struct FixedAdapter(Vec<RawItem>);

    #[async_trait]
    impl SourceAdapter for FixedAdapter {
        async fn fetch(&self, _category: &str, limit: usize) -> AdapterOutcome {
            AdapterOutcome::partial(self.0.iter().take(limit).cloned().collect(), None)
        }
    }

    fn items(n: usize) -> Vec<RawItem> {
        (0..n)
            .map(|i| RawItem {
                title: Some(format!("Council vote {i}")),
                url: Some(format!("https://wire.example.com/{i}")),
                description: Some("City council met on Tuesday".to_string()),
                ..RawItem::default()
            })
            .collect()
    }

    fn app_with(store: &Arc<MemoryStore>, n: usize, rate_limit: RateLimitState) -> Router {
        let adapter = Arc::new(FixedAdapter(items(n)));
        let sources = vec![SourceDescriptor::new("wire", 0, adapter)];
        let orchestrator = Arc::new(Orchestrator::new(
            sources,
            store.clone(),
            store.clone(),
            Arc::new(HeuristicScorer::default()),
            OrchestratorSettings::default(),
        ));
        let coordinator = Arc::new(Coordinator::new(
            store.clone(),
            vec![Pipeline::new("primary", orchestrator.clone())],
            vec!["general".to_string()],
            10,
        ));
        let service = Arc::new(IngestService::new(
            orchestrator,
            coordinator,
            store.clone(),
            store.clone(),
        ));
        build_app(
            AppState {
                service,
                default_max_age_hours: 48,
            },
            rate_limit,
        )
    }

    fn app(store: &Arc<MemoryStore>, n: usize) -> Router {
        app_with(store, n, default_rate_limit_state())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(-4)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        let cases = [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("bad_request", StatusCode::BAD_REQUEST),
            ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
            ("service_unavailable", StatusCode::SERVICE_UNAVAILABLE),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let response = ApiError::new("req-1", code, "msg").into_response();
            assert_eq!(response.status(), status, "{code}");
        }
    }

    #[test]
    fn invalid_request_maps_to_validation_error() {
        let err = map_ingest_error(
            "req-1".to_string(),
            &IngestError::InvalidRequest("category must not be empty".to_string()),
        );
        assert_eq!(err.error.code, "validation_error");
        assert_eq!(err.error.message, "category must not be empty");
    }

    #[tokio::test]
    async fn responses_carry_request_id_through_the_layer_stack() {
        let store = Arc::new(MemoryStore::new());
        let response = app(&store, 0)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-42");
        assert_eq!(body_json(response).await["meta"]["request_id"], "req-42");
    }

    #[tokio::test]
    async fn health_is_ok_then_degraded() {
        let store = Arc::new(MemoryStore::new());
        let app = app(&store, 0);

        let ok = app
            .clone()
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(body_json(ok).await["data"]["status"], "ok");

        store.set_unavailable(true);
        let degraded = app
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(degraded.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(degraded).await["data"]["database"], "unavailable");
    }

    #[tokio::test]
    async fn ingest_stores_articles_and_returns_counts() {
        let store = Arc::new(MemoryStore::new());
        let app = app(&store, 3);

        let response = app
            .oneshot(post_json("/api/v1/ingest", r#"{"category":"General","limit":10}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["success"], true);
        assert_eq!(json["data"]["total_stored"], 3);
        assert_eq!(json["data"]["logs"][0]["source_name"], "wire");
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn ingest_rejects_blank_category() {
        let store = Arc::new(MemoryStore::new());
        let response = app(&store, 3)
            .oneshot(post_json("/api/v1/ingest", r#"{"category":"  "}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn ingest_rejects_malformed_body() {
        let store = Arc::new(MemoryStore::new());
        let response = app(&store, 3)
            .oneshot(post_json("/api/v1/ingest", r#"{"limit":"many"}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn purge_refresh_returns_report() {
        let store = Arc::new(MemoryStore::new());
        let response = app(&store, 4)
            .oneshot(post_json("/api/v1/purge-refresh", r#"{"wipe_all":true}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["success"], true);
        assert_eq!(json["data"]["articles_added"], 4);
        assert_eq!(json["data"]["per_pipeline"][0]["pipeline"], "primary");
    }

    #[tokio::test]
    async fn purge_refresh_reports_store_failure_in_body() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let response = app(&store, 4)
            .oneshot(post_json("/api/v1/purge-refresh", "{}"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["success"], false);
        assert!(json["data"]["error"]
            .as_str()
            .expect("error message")
            .starts_with("purge failed"));
    }

    #[tokio::test]
    async fn logs_are_listed_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let app = app(&store, 2);
        for _ in 0..2 {
            app.clone()
                .oneshot(post_json("/api/v1/ingest", r#"{"category":"general"}"#))
                .await
                .expect("response");
        }

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/logs?limit=1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let rows = json["data"].as_array().expect("data array");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["category"], "general");
    }

    #[tokio::test]
    async fn api_routes_are_rate_limited_but_health_is_not() {
        let store = Arc::new(MemoryStore::new());
        let app = app_with(&store, 0, RateLimitState::new(1, Duration::from_secs(60)));
        let logs = || {
            Request::builder()
                .uri("/api/v1/logs")
                .body(Body::empty())
                .expect("request")
        };

        let first = app.clone().oneshot(logs()).await.expect("response");
        let second = app.clone().oneshot(logs()).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let health = app
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(health.status(), StatusCode::OK);
    }
}
