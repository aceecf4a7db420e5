//! Document upload and processing endpoint.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use docflow_core::models::{new_processing_id, ProcessingStatus};
use docflow_core::{validation, AppError};
use docflow_db::db::processing::NewProcessingRecord;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEnvelope {
    pub success: bool,
    pub processing_id: String,
    pub status: ProcessingStatus,
    pub message: String,
}

struct UploadForm {
    file_name: String,
    content_type: String,
    content: Vec<u8>,
    user_id: Option<String>,
    department: Option<String>,
    sharing_emails: Vec<String>,
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut user_id = None;
    let mut department = None;
    let mut sharing_emails = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(validation::sanitize_filename)
                    .unwrap_or_else(|| "file".to_string());
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((file_name, content_type, data.to_vec()));
            }
            "userId" => {
                user_id = field.text().await.ok().filter(|s| !s.is_empty());
            }
            "department" => {
                department = field.text().await.ok().filter(|s| !s.is_empty());
            }
            "sharingEmails" => {
                if let Ok(raw) = field.text().await {
                    sharing_emails = raw
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let (file_name, content_type, content) =
        file.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    Ok(UploadForm {
        file_name,
        content_type,
        content,
        user_id,
        department,
        sharing_emails,
    })
}

#[utoipa::path(
    get,
    path = "/api/document/process",
    tag = "documents",
    responses(
        (status = 200, description = "Usage description for the processing endpoint")
    )
)]
pub async fn process_usage() -> Json<Value> {
    Json(json!({
        "message": "POST a multipart form to this endpoint to process a document",
        "fields": {
            "file": "the document (required)",
            "userId": "uploader id (optional)",
            "department": "uploader department (optional)",
            "sharingEmails": "comma-separated recipient emails (optional)",
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/document/process",
    tag = "documents",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document accepted and processed", body = ProcessEnvelope),
        (status = 400, description = "Invalid upload", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn process_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ProcessEnvelope>, HttpAppError> {
    let form = read_multipart(multipart).await.map_err(HttpAppError)?;

    validation::validate_file_size(form.content.len(), state.documents.max_file_size)
        .map_err(HttpAppError)?;
    validation::validate_content_type(&form.content_type, &state.documents.allowed_content_types)
        .map_err(HttpAppError)?;
    validation::validate_extension(&form.file_name, &state.documents.allowed_extensions)
        .map_err(HttpAppError)?;

    let processing_id = new_processing_id();
    tracing::info!(
        processing_id = %processing_id,
        file_name = %form.file_name,
        size = form.content.len(),
        "Document received"
    );

    let (storage_key, storage_url) = state
        .documents
        .storage
        .upload(
            &processing_id,
            &form.file_name,
            &form.content_type,
            form.content.clone(),
        )
        .await
        .map_err(HttpAppError::from)?;

    let record = state
        .db
        .documents
        .create(NewProcessingRecord {
            id: &processing_id,
            file_name: &form.file_name,
            file_size: form.content.len() as i64,
            mime_type: &form.content_type,
            user_id: form.user_id.as_deref(),
            department: form.department.as_deref(),
            sharing_emails: &form.sharing_emails,
            storage_key: &storage_key,
            storage_url: &storage_url,
        })
        .await
        .map_err(HttpAppError::from)?;

    // The envelope is 200 regardless of per-stage outcomes; only infrastructure
    // failures (database, storage) surface as errors here.
    let final_record = match state.engine.pipeline.run(record, form.content).await {
        Ok(final_record) => final_record,
        Err(e) => {
            if let Err(mark_err) = state
                .db
                .documents
                .set_status(&processing_id, ProcessingStatus::Failed, Some(&e.to_string()))
                .await
            {
                tracing::warn!(
                    processing_id = %processing_id,
                    error = %mark_err,
                    "Failed to mark processing record as failed"
                );
            }
            return Err(HttpAppError::from(e));
        }
    };

    Ok(Json(ProcessEnvelope {
        success: true,
        processing_id: final_record.id.clone(),
        status: final_record.status,
        message: "Document processed".to_string(),
    }))
}
