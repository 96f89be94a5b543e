use axum::{
    extract::{Query, State},
    Extension, Json,
};
use newsdesk_core::FetchLogEntry;
use serde::Deserialize;

use super::{map_ingest_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct LogsQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_logs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<ApiResponse<Vec<FetchLogEntry>>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let logs = state
        .service
        .recent_logs(limit)
        .await
        .map_err(|e| map_ingest_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: logs,
        meta: ResponseMeta::new(req_id.0),
    }))
}
