use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use newsdesk_core::PurgeReport;
use newsdesk_ingest::{IngestResponse, DEFAULT_INGEST_LIMIT};
use serde::Deserialize;

use super::{map_ingest_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct IngestRequest {
    pub category: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct PurgeRefreshRequest {
    pub max_age_hours: Option<u32>,
    #[serde(default)]
    pub wipe_all: bool,
}

fn reject_body(request_id: String, rejection: &JsonRejection) -> ApiError {
    ApiError::new(request_id, "bad_request", rejection.body_text())
}

pub(super) async fn run_ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<IngestResponse>>, ApiError> {
    let Json(request) = body.map_err(|e| reject_body(req_id.0.clone(), &e))?;
    let limit = request.limit.unwrap_or(DEFAULT_INGEST_LIMIT);

    tracing::info!(
        category = %request.category,
        limit,
        force_refresh = request.force_refresh,
        "ingest requested"
    );
    let response = state
        .service
        .ingest(&request.category, limit, request.force_refresh)
        .await
        .map_err(|e| map_ingest_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: response,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Always answers 200 once the body parses; `data.success` carries the outcome.
pub(super) async fn run_purge_refresh(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<PurgeRefreshRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<PurgeReport>>, ApiError> {
    let Json(request) = body.map_err(|e| reject_body(req_id.0.clone(), &e))?;
    let max_age_hours = request.max_age_hours.unwrap_or(state.default_max_age_hours);

    tracing::info!(max_age_hours, wipe_all = request.wipe_all, "purge-and-refresh requested");
    let report = state
        .service
        .purge_and_refresh(max_age_hours, request.wipe_all)
        .await;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
