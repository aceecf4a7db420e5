//! Route configuration and setup

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use docflow_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Server-level concurrency limit to protect against resource exhaustion under extreme load
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    // Multipart bodies carry form fields alongside the file itself, so the
    // body limit needs headroom above the raw document limit.
    let body_limit = config.max_document_size_bytes() + 1024 * 1024;

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/document/process",
            get(handlers::process::process_usage).post(handlers::process::process_document),
        )
        .route("/api/document/status", get(handlers::status::list_status))
        .route(
            "/api/document/status/{id}",
            get(handlers::status::get_status),
        )
        .route(
            "/api/document/get-all-completed",
            get(handlers::status::list_completed),
        )
        .route("/gdpr", get(handlers::gdpr::list_gdpr_documents))
        .route(
            "/api/approvals/pending",
            get(handlers::approvals::list_pending),
        )
        .route(
            "/api/approvals/{processing_id}",
            get(handlers::approvals::list_for_processing),
        )
        .route(
            "/api/approvals/{id}/decision",
            post(handlers::approvals::decide),
        )
        .route(
            "/api/engine/workflows",
            get(handlers::engine_workflows::list_workflows),
        )
        .route(
            "/api/engine/workflows/{id}",
            get(handlers::engine_workflows::get_workflow),
        )
        .route(
            "/api/engine/workflows/{id}/activate",
            post(handlers::engine_workflows::activate_workflow),
        )
        .route(
            "/api/engine/workflows/{id}/deactivate",
            post(handlers::engine_workflows::deactivate_workflow),
        )
        .route(
            "/api/engine/workflows/{id}/status",
            get(handlers::engine_workflows::workflow_status),
        )
        .route(
            "/webhook/analysis-result",
            post(handlers::callbacks::analysis_result),
        )
        .route(
            "/webhook/gdpr-result",
            post(handlers::callbacks::gdpr_result),
        )
        .route(
            "/webhook/sharing-result",
            post(handlers::callbacks::sharing_result),
        )
        .route("/api/storage/upload", post(handlers::files::upload_file))
        .route(
            "/api/storage/download/{*key}",
            get(handlers::files::download_file),
        )
        .route("/uploads/{*key}", get(handlers::files::serve_upload))
        .route(
            "/api/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        // Axum's built-in 2 MB extractor limit would otherwise cap uploads
        // below the configured document size; the layer above is the limit.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins().iter().map(|o| o.parse()).collect();

        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Multipart;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use tower::ServiceExt;

    async fn drain_upload(mut multipart: Multipart) -> StatusCode {
        loop {
            match multipart.next_field().await {
                Ok(Some(field)) => {
                    if field.bytes().await.is_err() {
                        return StatusCode::BAD_REQUEST;
                    }
                }
                Ok(None) => return StatusCode::OK,
                Err(_) => return StatusCode::BAD_REQUEST,
            }
        }
    }

    /// Router with the document-upload body layers in production order.
    fn upload_router(body_limit: usize) -> Router<()> {
        Router::new()
            .route("/process", post(drain_upload))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(DefaultBodyLimit::disable())
    }

    fn multipart_upload(file_len: usize) -> (String, Vec<u8>) {
        let boundary = "docflow-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"big.pdf\"\r\n\
              Content-Type: application/pdf\r\n\r\n",
        );
        body.extend_from_slice(&vec![b'x'; file_len]);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    async fn post_upload(app: Router<()>, file_len: usize) -> StatusCode {
        let (content_type, body) = multipart_upload(file_len);
        let request = Request::builder()
            .method("POST")
            .uri("/process")
            .header("content-type", content_type)
            .header("content-length", body.len().to_string())
            .body(Body::from(body))
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_uploads_above_two_megabytes_pass_the_body_layers() {
        // Default config allows 50 MB; a 3 MB file must reach the handler.
        let app = upload_router(50 * 1024 * 1024 + 1024 * 1024);
        assert_eq!(post_upload(app, 3 * 1024 * 1024).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_uploads_above_the_configured_limit_are_rejected() {
        let app = upload_router(2 * 1024 * 1024);
        assert_eq!(
            post_upload(app, 3 * 1024 * 1024).await,
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
