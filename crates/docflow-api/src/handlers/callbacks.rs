//! Result callback receivers for asynchronous workflow completions.
//!
//! Workflows that finish after the synchronous webhook response POST their
//! results here. Unknown processing ids are acknowledged with 200 so the
//! engine does not retry them forever.

use crate::error::HttpAppError;
use crate::state::EngineState;
use axum::extract::State;
use axum::Json;
use docflow_core::models::{Stage, StageResultCallback};
use serde_json::{json, Value};

async fn apply(
    engine: EngineState,
    stage: Stage,
    callback: StageResultCallback,
) -> Result<Json<Value>, HttpAppError> {
    let processing_id = callback.processing_id.clone();
    engine
        .pipeline
        .apply_callback(stage, callback)
        .await
        .map_err(HttpAppError::from)?;
    Ok(Json(json!({"success": true, "processingId": processing_id})))
}

#[utoipa::path(
    post,
    path = "/webhook/analysis-result",
    tag = "callbacks",
    request_body = StageResultCallback,
    responses((status = 200, description = "Callback acknowledged"))
)]
pub async fn analysis_result(
    State(engine): State<EngineState>,
    Json(callback): Json<StageResultCallback>,
) -> Result<Json<Value>, HttpAppError> {
    apply(engine, Stage::Analysis, callback).await
}

#[utoipa::path(
    post,
    path = "/webhook/gdpr-result",
    tag = "callbacks",
    request_body = StageResultCallback,
    responses((status = 200, description = "Callback acknowledged"))
)]
pub async fn gdpr_result(
    State(engine): State<EngineState>,
    Json(callback): Json<StageResultCallback>,
) -> Result<Json<Value>, HttpAppError> {
    apply(engine, Stage::Gdpr, callback).await
}

#[utoipa::path(
    post,
    path = "/webhook/sharing-result",
    tag = "callbacks",
    request_body = StageResultCallback,
    responses((status = 200, description = "Callback acknowledged"))
)]
pub async fn sharing_result(
    State(engine): State<EngineState>,
    Json(callback): Json<StageResultCallback>,
) -> Result<Json<Value>, HttpAppError> {
    apply(engine, Stage::Sharing, callback).await
}
