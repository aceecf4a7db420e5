//! Object-storage pass-through: ad-hoc uploads, downloads, and the public
//! `/uploads/{key}` URLs handed to the automation engine.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::DocumentConfig;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::Json;
use docflow_core::{validation, AppError};
use serde_json::{json, Value};
use uuid::Uuid;

fn content_type_for(key: &str) -> HeaderValue {
    let guessed = mime_guess::from_path(key).first_or_octet_stream();
    HeaderValue::from_str(guessed.essence_str())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

#[utoipa::path(
    post,
    path = "/api/storage/upload",
    tag = "storage",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored"),
        (status = 400, description = "Invalid upload", body = ErrorResponse)
    )
)]
pub async fn upload_file(
    State(documents): State<DocumentConfig>,
    mut multipart: Multipart,
) -> Result<Json<Value>, HttpAppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpAppError(AppError::BadRequest(format!("Malformed multipart body: {}", e))))?
    {
        if field.name() != Some("file") {
            continue;
        }
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
            .map_err(|e| HttpAppError(AppError::BadRequest(format!("Failed to read file: {}", e))))?
            .to_vec();

        validation::validate_file_size(data.len(), documents.max_file_size)
            .map_err(HttpAppError)?;

        // Ad-hoc uploads are scoped by a fresh id, same key layout as
        // pipeline uploads.
        let scope = Uuid::new_v4().to_string();
        let (key, url) = documents
            .storage
            .upload(&scope, &file_name, &content_type, data)
            .await
            .map_err(HttpAppError::from)?;

        return Ok(Json(json!({"key": key, "url": url})));
    }

    Err(HttpAppError(AppError::BadRequest(
        "No file uploaded".to_string(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/storage/download/{key}",
    tag = "storage",
    params(("key" = String, Path, description = "Full storage key")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Unknown key", body = ErrorResponse)
    )
)]
pub async fn download_file(
    State(documents): State<DocumentConfig>,
    Path(key): Path<String>,
) -> Result<(HeaderMap, Vec<u8>), HttpAppError> {
    let data = documents
        .storage
        .download(&key)
        .await
        .map_err(HttpAppError::from)?;

    let file_name = key.rsplit('/').next().unwrap_or("file");
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type_for(&key));
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok((headers, data))
}

#[utoipa::path(
    get,
    path = "/uploads/{key}",
    tag = "storage",
    params(("key" = String, Path, description = "Key under the uploads/ prefix")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Unknown key", body = ErrorResponse)
    )
)]
pub async fn serve_upload(
    State(documents): State<DocumentConfig>,
    Path(key): Path<String>,
) -> Result<(HeaderMap, Vec<u8>), HttpAppError> {
    // Public URLs are `{base}/uploads/{processing_id}/{file}`; storage keys
    // carry the `uploads/` prefix.
    let storage_key = format!("uploads/{}", key);
    let data = documents
        .storage
        .download(&storage_key)
        .await
        .map_err(HttpAppError::from)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type_for(&storage_key));
    Ok((headers, data))
}
