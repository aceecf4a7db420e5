//! Processing status and listing endpoints.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::DbState;
use axum::extract::{Path, Query, State};
use axum::Json;
use docflow_core::models::ProcessingRecordResponse;
use docflow_core::AppError;
use serde::Deserialize;

const DEFAULT_COMPLETED_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/document/status/{id}",
    tag = "documents",
    params(("id" = String, Path, description = "Processing id")),
    responses(
        (status = 200, description = "Processing record", body = ProcessingRecordResponse),
        (status = 404, description = "Unknown processing id", body = ErrorResponse)
    )
)]
pub async fn get_status(
    State(db): State<DbState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessingRecordResponse>, HttpAppError> {
    let record = db
        .documents
        .get(&id)
        .await
        .map_err(HttpAppError::from)?
        .ok_or_else(|| {
            HttpAppError(AppError::NotFound(format!("No processing record for {}", id)))
        })?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    get,
    path = "/api/document/status",
    tag = "documents",
    responses(
        (status = 200, description = "All processing records", body = [ProcessingRecordResponse])
    )
)]
pub async fn list_status(
    State(db): State<DbState>,
) -> Result<Json<Vec<ProcessingRecordResponse>>, HttpAppError> {
    let records = db.documents.list_all().await.map_err(HttpAppError::from)?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/document/get-all-completed",
    tag = "documents",
    params(("limit" = Option<i64>, Query, description = "Max records to return")),
    responses(
        (status = 200, description = "Completed documents", body = [ProcessingRecordResponse])
    )
)]
pub async fn list_completed(
    State(db): State<DbState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ProcessingRecordResponse>>, HttpAppError> {
    let limit = query.limit.unwrap_or(DEFAULT_COMPLETED_LIMIT).clamp(1, 500);
    let records = db
        .documents
        .list_completed(limit)
        .await
        .map_err(HttpAppError::from)?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}
