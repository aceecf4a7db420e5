//! GDPR dashboard listing.

use crate::error::HttpAppError;
use crate::state::DbState;
use axum::extract::{Query, State};
use axum::Json;
use docflow_core::models::GdprDocumentView;
use serde::Deserialize;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct GdprQuery {
    pub limit: Option<i64>,
    pub has_analysis: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/gdpr",
    tag = "gdpr",
    params(
        ("limit" = Option<i64>, Query, description = "Max rows to return"),
        ("has_analysis" = Option<bool>, Query, description = "Filter on presence of an analysis result")
    ),
    responses(
        (status = 200, description = "Documents with GDPR compliance state", body = [GdprDocumentView])
    )
)]
pub async fn list_gdpr_documents(
    State(db): State<DbState>,
    Query(query): Query<GdprQuery>,
) -> Result<Json<Vec<GdprDocumentView>>, HttpAppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 1000);
    let rows = db
        .documents
        .gdpr_view(limit, query.has_analysis)
        .await
        .map_err(HttpAppError::from)?;
    Ok(Json(rows))
}
