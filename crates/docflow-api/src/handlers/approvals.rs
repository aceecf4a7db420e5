//! Sharing approval endpoints.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::DbState;
use axum::extract::{Path, State};
use axum::Json;
use docflow_core::models::ApprovalStatus;
use docflow_core::models::sharing::SharingRecordResponse;
use docflow_core::AppError;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionBody {
    pub approved: bool,
    pub approved_by: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/approvals/pending",
    tag = "approvals",
    responses(
        (status = 200, description = "Pending sharing requests", body = [SharingRecordResponse])
    )
)]
pub async fn list_pending(
    State(db): State<DbState>,
) -> Result<Json<Vec<SharingRecordResponse>>, HttpAppError> {
    let rows = db.sharing.list_pending().await.map_err(HttpAppError::from)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/approvals/{processing_id}",
    tag = "approvals",
    params(("processing_id" = String, Path, description = "Processing id")),
    responses(
        (status = 200, description = "Sharing requests for one document", body = [SharingRecordResponse])
    )
)]
pub async fn list_for_processing(
    State(db): State<DbState>,
    Path(processing_id): Path<String>,
) -> Result<Json<Vec<SharingRecordResponse>>, HttpAppError> {
    let rows = db
        .sharing
        .list_for_processing(&processing_id)
        .await
        .map_err(HttpAppError::from)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/approvals/{id}/decision",
    tag = "approvals",
    params(("id" = Uuid, Path, description = "Sharing request id")),
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Decision recorded", body = SharingRecordResponse),
        (status = 404, description = "Unknown or already decided request", body = ErrorResponse)
    )
)]
pub async fn decide(
    State(db): State<DbState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<SharingRecordResponse>, HttpAppError> {
    let status = if body.approved {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Rejected
    };
    let record = db
        .sharing
        .decide(id, status, body.approved_by.as_deref())
        .await
        .map_err(HttpAppError::from)?
        .ok_or_else(|| {
            HttpAppError(AppError::NotFound(format!(
                "No pending sharing request {}",
                id
            )))
        })?;

    tracing::info!(sharing_id = %id, status = %record.approval_status, "Sharing decision recorded");
    Ok(Json(record.into()))
}
