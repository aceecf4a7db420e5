//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use docflow_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Docflow API",
        version = "0.1.0",
        description = "Document processing gateway: multipart uploads are run through analysis, GDPR compliance, and sharing stages via automation-engine webhooks, with results persisted in Postgres."
    ),
    paths(
        handlers::health::health,
        // Document processing
        handlers::process::process_usage,
        handlers::process::process_document,
        handlers::status::get_status,
        handlers::status::list_status,
        handlers::status::list_completed,
        // GDPR
        handlers::gdpr::list_gdpr_documents,
        // Sharing approvals
        handlers::approvals::list_pending,
        handlers::approvals::list_for_processing,
        handlers::approvals::decide,
        // Engine workflows
        handlers::engine_workflows::list_workflows,
        handlers::engine_workflows::get_workflow,
        handlers::engine_workflows::activate_workflow,
        handlers::engine_workflows::deactivate_workflow,
        handlers::engine_workflows::workflow_status,
        // Stage result callbacks
        handlers::callbacks::analysis_result,
        handlers::callbacks::gdpr_result,
        handlers::callbacks::sharing_result,
        // Storage
        handlers::files::upload_file,
        handlers::files::download_file,
        handlers::files::serve_upload,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::process::ProcessEnvelope,
        handlers::approvals::DecisionBody,
        models::ProcessingStatus,
        models::StageStatus,
        models::Stage,
        models::StageStatuses,
        models::StageResults,
        models::ProcessingRecordResponse,
        models::GdprDecision,
        models::GdprDocumentView,
        models::ApprovalStatus,
        models::SharingRecordResponse,
        models::FilePayload,
        models::StagePayload,
        models::StageResultCallback,
        models::EngineWorkflow,
    )),
    tags(
        (name = "documents", description = "Document upload and processing pipeline"),
        (name = "gdpr", description = "GDPR compliance results"),
        (name = "approvals", description = "Sharing approval decisions"),
        (name = "engine", description = "Automation engine workflow management"),
        (name = "callbacks", description = "Stage result callbacks from the engine"),
        (name = "storage", description = "Raw file storage access"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
