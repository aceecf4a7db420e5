//! Pass-through endpoints for the automation engine's management API.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::EngineState;
use axum::extract::{Path, Query, State};
use axum::Json;
use docflow_core::models::EngineWorkflow;
use docflow_core::AppError;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ActiveQuery {
    pub active: Option<bool>,
}

fn engine_error(e: anyhow::Error) -> HttpAppError {
    HttpAppError(AppError::Engine(e.to_string()))
}

#[utoipa::path(
    get,
    path = "/api/engine/workflows",
    tag = "engine",
    params(("active" = Option<bool>, Query, description = "Filter by active state")),
    responses(
        (status = 200, description = "Workflows known to the engine", body = [EngineWorkflow]),
        (status = 502, description = "Engine unreachable", body = ErrorResponse)
    )
)]
pub async fn list_workflows(
    State(engine): State<EngineState>,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<Vec<EngineWorkflow>>, HttpAppError> {
    let workflows = engine
        .client
        .list_workflows(query.active)
        .await
        .map_err(engine_error)?;
    Ok(Json(workflows))
}

#[utoipa::path(
    get,
    path = "/api/engine/workflows/{id}",
    tag = "engine",
    params(("id" = String, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow descriptor", body = EngineWorkflow),
        (status = 404, description = "Unknown workflow", body = ErrorResponse)
    )
)]
pub async fn get_workflow(
    State(engine): State<EngineState>,
    Path(id): Path<String>,
) -> Result<Json<EngineWorkflow>, HttpAppError> {
    let workflow = engine
        .client
        .get_workflow(&id)
        .await
        .map_err(engine_error)?
        .ok_or_else(|| HttpAppError(AppError::NotFound(format!("No workflow {}", id))))?;
    Ok(Json(workflow))
}

#[utoipa::path(
    post,
    path = "/api/engine/workflows/{id}/activate",
    tag = "engine",
    params(("id" = String, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow activated"),
        (status = 502, description = "Engine rejected the request", body = ErrorResponse)
    )
)]
pub async fn activate_workflow(
    State(engine): State<EngineState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, HttpAppError> {
    engine
        .client
        .set_workflow_active(&id, true)
        .await
        .map_err(engine_error)?;
    Ok(Json(json!({"id": id, "active": true})))
}

#[utoipa::path(
    post,
    path = "/api/engine/workflows/{id}/deactivate",
    tag = "engine",
    params(("id" = String, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow deactivated"),
        (status = 502, description = "Engine rejected the request", body = ErrorResponse)
    )
)]
pub async fn deactivate_workflow(
    State(engine): State<EngineState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, HttpAppError> {
    engine
        .client
        .set_workflow_active(&id, false)
        .await
        .map_err(engine_error)?;
    Ok(Json(json!({"id": id, "active": false})))
}

#[utoipa::path(
    get,
    path = "/api/engine/workflows/{id}/status",
    tag = "engine",
    params(("id" = String, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Whether the workflow is active"),
        (status = 502, description = "Engine unreachable", body = ErrorResponse)
    )
)]
pub async fn workflow_status(
    State(engine): State<EngineState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, HttpAppError> {
    let active = engine
        .client
        .workflow_is_active(&id)
        .await
        .map_err(engine_error)?;
    Ok(Json(json!({"id": id, "active": active})))
}
