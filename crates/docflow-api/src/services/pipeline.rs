//! Document processing pipeline
//!
//! Runs the three delegated stages for one upload: analysis, GDPR
//! compliance, and sharing. Every engine dispatch goes through the serial
//! request queue; analysis results are cached by file content; a 404 from
//! the engine triggers workflow activation before the next retry.
//!
//! A stage failure is recorded on the stage and never aborts the stages
//! after it. The one exception is the GDPR gate: sharing is skipped when
//! the GDPR stage produced no result or decided `delete`.

use anyhow::{Context, Result};
use docflow_core::models::{
    FilePayload, GdprDecision, ProcessingRecord, ProcessingStatus, Stage, StagePayload,
    StageResultCallback, StageStatus,
};
use docflow_core::Config;
use docflow_db::{GdprResultRepository, ProcessingRepository, SharingRepository};
use docflow_engine::{EngineClient, EngineResponse};
use docflow_infra::{ResultCache, RetryPolicy, SerialRequestQueue};
use serde_json::Value as JsonValue;

pub struct DocumentPipeline {
    documents: ProcessingRepository,
    gdpr_results: GdprResultRepository,
    sharing: SharingRepository,
    engine: EngineClient,
    queue: SerialRequestQueue,
    cache: ResultCache,
    retry: RetryPolicy,
    config: Config,
}

impl DocumentPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        documents: ProcessingRepository,
        gdpr_results: GdprResultRepository,
        sharing: SharingRepository,
        engine: EngineClient,
        queue: SerialRequestQueue,
        cache: ResultCache,
        retry: RetryPolicy,
        config: Config,
    ) -> Self {
        Self {
            documents,
            gdpr_results,
            sharing,
            engine,
            queue,
            cache,
            retry,
            config,
        }
    }

    /// Run all stages for one upload and return the final record.
    pub async fn run(&self, record: ProcessingRecord, content: Vec<u8>) -> Result<ProcessingRecord> {
        let id = record.id.clone();
        self.documents
            .set_status(&id, ProcessingStatus::Processing, None)
            .await?;

        let base_payload = StagePayload {
            processing_id: id.clone(),
            file: FilePayload {
                file_name: record.file_name.clone(),
                file_size: record.file_size,
                mime_type: record.mime_type.clone(),
                file_url: record.storage_url.clone(),
            },
            user_id: record.user_id.clone(),
            department: record.department.clone(),
            sharing_emails: record.sharing_emails.clone(),
            analysis_results: None,
            gdpr_results: None,
        };

        let analysis_result = self.run_analysis(&record, &content, &base_payload).await?;
        let gdpr_result = self
            .run_gdpr(&id, &base_payload, analysis_result.clone())
            .await?;
        self.run_sharing(&record, &base_payload, analysis_result, gdpr_result)
            .await?;

        self.documents
            .set_status(&id, ProcessingStatus::Completed, None)
            .await?;

        self.documents
            .get(&id)
            .await?
            .context("Processing record disappeared mid-pipeline")
    }

    async fn run_analysis(
        &self,
        record: &ProcessingRecord,
        content: &[u8],
        base_payload: &StagePayload,
    ) -> Result<Option<JsonValue>> {
        let id = &record.id;
        self.documents
            .update_stage(id, Stage::Analysis, StageStatus::Processing, None, None)
            .await?;

        let cache_key = ResultCache::key_for(&record.file_name, content);
        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::info!(processing_id = %id, "Analysis served from cache");
            self.documents
                .update_stage(
                    id,
                    Stage::Analysis,
                    StageStatus::Completed,
                    Some(&cached),
                    None,
                )
                .await?;
            return Ok(Some(cached));
        }

        let outcome = self
            .dispatch_stage(
                Stage::Analysis,
                self.config.analysis_webhook_path(),
                self.config.analysis_workflow_id(),
                base_payload.clone(),
            )
            .await;

        match outcome {
            Ok(body) => {
                if let Err(e) = self.cache.put(&cache_key, &record.file_name, &body).await {
                    tracing::warn!(processing_id = %id, error = %e, "Failed to cache analysis result");
                }
                self.documents
                    .update_stage(id, Stage::Analysis, StageStatus::Completed, Some(&body), None)
                    .await?;
                Ok(Some(body))
            }
            Err(message) => {
                self.fail_stage(id, Stage::Analysis, &message).await?;
                Ok(None)
            }
        }
    }

    async fn run_gdpr(
        &self,
        id: &str,
        base_payload: &StagePayload,
        analysis_result: Option<JsonValue>,
    ) -> Result<Option<JsonValue>> {
        self.documents
            .update_stage(id, Stage::Gdpr, StageStatus::Processing, None, None)
            .await?;

        let mut payload = base_payload.clone();
        payload.analysis_results = analysis_result;

        let outcome = self
            .dispatch_stage(
                Stage::Gdpr,
                self.config.gdpr_webhook_path(),
                self.config.gdpr_workflow_id(),
                payload,
            )
            .await;

        match outcome {
            Ok(body) => {
                self.documents
                    .update_stage(id, Stage::Gdpr, StageStatus::Completed, Some(&body), None)
                    .await?;
                if let Some(decision) = parse_gdpr_decision(&body) {
                    self.gdpr_results
                        .create(id, decision, Some(&body))
                        .await
                        .context("Failed to persist GDPR compliance result")?;
                } else {
                    tracing::warn!(processing_id = %id, "GDPR result carries no decision");
                }
                Ok(Some(body))
            }
            Err(message) => {
                self.fail_stage(id, Stage::Gdpr, &message).await?;
                Ok(None)
            }
        }
    }

    async fn run_sharing(
        &self,
        record: &ProcessingRecord,
        base_payload: &StagePayload,
        analysis_result: Option<JsonValue>,
        gdpr_result: Option<JsonValue>,
    ) -> Result<()> {
        let id = &record.id;

        let (decision, blocked) = sharing_gate(gdpr_result.as_ref());
        if blocked {
            tracing::info!(
                processing_id = %id,
                decision = decision.map(|d| d.to_string()).unwrap_or_else(|| "none".into()),
                "Sharing skipped"
            );
            self.documents
                .update_stage(id, Stage::Sharing, StageStatus::Skipped, None, None)
                .await?;
            return Ok(());
        }

        self.documents
            .update_stage(id, Stage::Sharing, StageStatus::Processing, None, None)
            .await?;

        let mut payload = base_payload.clone();
        payload.analysis_results = analysis_result;
        payload.gdpr_results = gdpr_result;

        let outcome = self
            .dispatch_stage(
                Stage::Sharing,
                self.config.sharing_webhook_path(),
                self.config.sharing_workflow_id(),
                payload,
            )
            .await;

        match outcome {
            Ok(body) => {
                self.documents
                    .update_stage(id, Stage::Sharing, StageStatus::Completed, Some(&body), None)
                    .await?;
                let request = self
                    .sharing
                    .create(id, &record.sharing_emails)
                    .await
                    .context("Failed to persist sharing request")?;
                self.sharing
                    .set_result(request.id, &body)
                    .await
                    .context("Failed to store sharing result")?;
                Ok(())
            }
            Err(message) => self.fail_stage(id, Stage::Sharing, &message).await,
        }
    }

    async fn fail_stage(&self, id: &str, stage: Stage, message: &str) -> Result<()> {
        tracing::error!(processing_id = %id, stage = %stage, error = %message, "Stage failed");
        self.documents
            .update_stage(id, stage, StageStatus::Failed, None, Some(message))
            .await?;
        Ok(())
    }

    /// Deliver a stage payload via the serial queue with retries. A 404
    /// means the target workflow is inactive: the pipeline tries to activate
    /// it through the management API before the next attempt.
    async fn dispatch_stage(
        &self,
        stage: Stage,
        webhook_path: &str,
        workflow_id: Option<&str>,
        payload: StagePayload,
    ) -> std::result::Result<JsonValue, String> {
        let outcome = self
            .retry
            .run(
                |attempt| {
                    let payload = payload.clone();
                    let path = webhook_path.to_string();
                    let workflow_id = workflow_id.map(str::to_string);
                    async move {
                        tracing::debug!(
                            stage = %stage,
                            attempt = attempt + 1,
                            "Dispatching stage webhook"
                        );
                        let response = self.trigger_queued(&path, &payload).await?;
                        if response.is_workflow_missing() {
                            if let Some(id) = workflow_id.as_deref() {
                                tracing::warn!(
                                    stage = %stage,
                                    workflow_id = id,
                                    "Workflow inactive; activating before retry"
                                );
                                if let Err(e) = self.engine.set_workflow_active(id, true).await {
                                    tracing::warn!(
                                        workflow_id = id,
                                        error = %e,
                                        "Workflow activation failed"
                                    );
                                }
                            }
                        }
                        Ok::<EngineResponse, anyhow::Error>(response)
                    }
                },
                |outcome| match outcome {
                    Ok(response) => !response.is_success(),
                    Err(_) => true,
                },
            )
            .await;

        match outcome {
            Ok(response) if response.is_success() => Ok(response.body),
            Ok(response) => Err(format!(
                "Engine returned status {} for {} stage",
                response.status, stage
            )),
            Err(e) => Err(format!("Engine unreachable for {} stage: {}", stage, e)),
        }
    }

    async fn trigger_queued(
        &self,
        webhook_path: &str,
        payload: &StagePayload,
    ) -> Result<EngineResponse> {
        let client = self.engine.clone();
        let path = webhook_path.to_string();
        let payload = payload.clone();
        let rx = self
            .queue
            .enqueue(0, move || async move { client.trigger_webhook(&path, &payload).await });
        rx.await.context("Dispatch queue shut down")?
    }

    /// Apply an asynchronous result callback from a workflow. Unknown ids
    /// and settled stages are acknowledged without effect.
    pub async fn apply_callback(&self, stage: Stage, callback: StageResultCallback) -> Result<()> {
        let id = callback.processing_id.clone();
        let Some(_record) = self.documents.get(&id).await? else {
            tracing::warn!(processing_id = %id, stage = %stage, "Callback for unknown processing id");
            return Ok(());
        };

        let failed = callback.success == Some(false) || callback.error.is_some();
        let status = if failed {
            StageStatus::Failed
        } else {
            StageStatus::Completed
        };

        let updated = self
            .documents
            .update_stage(
                &id,
                stage,
                status,
                callback.results.as_ref(),
                callback.error.as_deref(),
            )
            .await?;
        if updated.is_none() {
            tracing::debug!(processing_id = %id, stage = %stage, "Callback ignored; stage already settled");
            return Ok(());
        }

        if stage == Stage::Gdpr && !failed {
            if let Some(decision) = callback.results.as_ref().and_then(parse_gdpr_decision) {
                self.gdpr_results
                    .create(&id, decision, callback.results.as_ref())
                    .await
                    .context("Failed to persist GDPR compliance result")?;
            }
        }

        tracing::info!(processing_id = %id, stage = %stage, status = %status, "Callback applied");
        Ok(())
    }
}

/// The GDPR workflow reports its decision as `gdprDecision` (or `decision`
/// in older workflow versions).
fn parse_gdpr_decision(body: &JsonValue) -> Option<GdprDecision> {
    body.get("gdprDecision")
        .or_else(|| body.get("decision"))
        .and_then(JsonValue::as_str)
        .and_then(|s| s.parse().ok())
}

/// Gate for the sharing stage: blocked when the GDPR stage produced no
/// result at all, or when its decision forbids distribution. A result
/// without a recognizable decision does not block.
fn sharing_gate(gdpr_result: Option<&JsonValue>) -> (Option<GdprDecision>, bool) {
    let decision = gdpr_result.and_then(parse_gdpr_decision);
    let blocked = match (gdpr_result, decision) {
        (None, _) => true,
        (Some(_), Some(d)) if d.blocks_sharing() => true,
        _ => false,
    };
    (decision, blocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use docflow_core::{BaseConfig, GatewayConfig, StorageBackend};
    use docflow_infra::QueueConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config(engine_base_url: &str) -> Config {
        Config(Box::new(GatewayConfig {
            base: BaseConfig {
                server_port: 5000,
                cors_origins: vec!["*".to_string()],
                db_max_connections: 1,
                db_timeout_seconds: 1,
                environment: "development".to_string(),
            },
            // Never connected to in these tests; the pool is lazy.
            database_url: "postgresql://127.0.0.1:1/docflow".to_string(),
            public_base_url: "http://localhost:5000".to_string(),
            storage_backend: StorageBackend::Local,
            local_storage_path: "uploads".to_string(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            max_document_size_bytes: 50 * 1024 * 1024,
            document_allowed_extensions: vec!["pdf".to_string()],
            document_allowed_content_types: vec!["application/pdf".to_string()],
            engine_base_url: engine_base_url.to_string(),
            engine_api_key: None,
            engine_webhook_timeout_secs: 5,
            engine_api_timeout_secs: 5,
            analysis_webhook_path: "/webhook/document-analyzer".to_string(),
            gdpr_webhook_path: "/webhook/gdpr-compliance".to_string(),
            sharing_webhook_path: "/webhook/document-management".to_string(),
            analysis_workflow_id: None,
            gdpr_workflow_id: Some("wf-gdpr".to_string()),
            sharing_workflow_id: None,
            cache_dir: "cache/results".to_string(),
            cache_ttl_seconds: 60,
            queue_dispatch_delay_ms: 1,
            queue_max_concurrent: 1,
        }))
    }

    async fn test_pipeline(engine_base_url: &str) -> (DocumentPipeline, tempfile::TempDir) {
        let cache_dir = tempfile::tempdir().unwrap();
        let config = test_config(engine_base_url);
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(config.database_url())
            .unwrap();
        let engine = EngineClient::new(&config).unwrap();
        let queue = SerialRequestQueue::new(QueueConfig {
            dispatch_delay: Duration::from_millis(1),
            max_concurrent: 1,
        });
        let cache = ResultCache::new(cache_dir.path(), Duration::from_secs(60))
            .await
            .unwrap();
        let retry = RetryPolicy::new(vec![Duration::from_millis(10)]);
        let pipeline = DocumentPipeline::new(
            ProcessingRepository::new(pool.clone()),
            GdprResultRepository::new(pool.clone()),
            SharingRepository::new(pool),
            engine,
            queue,
            cache,
            retry,
            config,
        );
        (pipeline, cache_dir)
    }

    async fn serve_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn test_payload() -> StagePayload {
        StagePayload {
            processing_id: "doc_1700000000000_abcdefghi".to_string(),
            file: FilePayload {
                file_name: "report.pdf".to_string(),
                file_size: 2048,
                mime_type: "application/pdf".to_string(),
                file_url: "http://localhost:5000/uploads/doc_1/report.pdf".to_string(),
            },
            user_id: None,
            department: None,
            sharing_emails: vec![],
            analysis_results: None,
            gdpr_results: None,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispatch_returns_engine_body_on_success() {
        let app = Router::new().route(
            "/webhook/document-analyzer",
            post(|| async { Json(json!({"summary": "ok"})) }),
        );
        let base = serve_stub(app).await;
        let (pipeline, _cache_dir) = test_pipeline(&base).await;

        let body = pipeline
            .dispatch_stage(
                Stage::Analysis,
                "/webhook/document-analyzer",
                None,
                test_payload(),
            )
            .await
            .unwrap();
        assert_eq!(body, json!({"summary": "ok"}));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispatch_activates_workflow_after_404_then_retries() {
        let webhook_hits = Arc::new(AtomicUsize::new(0));
        let activations = Arc::new(AtomicUsize::new(0));
        let wh = webhook_hits.clone();
        let act = activations.clone();
        let app = Router::new()
            .route(
                "/webhook/gdpr-compliance",
                post(move || {
                    let wh = wh.clone();
                    async move {
                        if wh.fetch_add(1, Ordering::SeqCst) == 0 {
                            (
                                StatusCode::NOT_FOUND,
                                Json(json!({"message": "workflow not active"})),
                            )
                        } else {
                            (StatusCode::OK, Json(json!({"gdprDecision": "allow"})))
                        }
                    }
                }),
            )
            .route(
                "/api/v1/workflows/wf-gdpr/activate",
                post(move || {
                    let act = act.clone();
                    async move {
                        act.fetch_add(1, Ordering::SeqCst);
                        StatusCode::OK
                    }
                }),
            );
        let base = serve_stub(app).await;
        let (pipeline, _cache_dir) = test_pipeline(&base).await;

        let body = pipeline
            .dispatch_stage(
                Stage::Gdpr,
                "/webhook/gdpr-compliance",
                Some("wf-gdpr"),
                test_payload(),
            )
            .await
            .unwrap();
        assert_eq!(body["gdprDecision"], "allow");
        // The 404 triggers exactly one activation call before the retry.
        assert_eq!(webhook_hits.load(Ordering::SeqCst), 2);
        assert_eq!(activations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispatch_reports_failure_after_retries_exhausted() {
        let webhook_hits = Arc::new(AtomicUsize::new(0));
        let wh = webhook_hits.clone();
        let app = Router::new().route(
            "/webhook/document-management",
            post(move || {
                let wh = wh.clone();
                async move {
                    wh.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"message": "boom"})),
                    )
                }
            }),
        );
        let base = serve_stub(app).await;
        let (pipeline, _cache_dir) = test_pipeline(&base).await;

        let err = pipeline
            .dispatch_stage(
                Stage::Sharing,
                "/webhook/document-management",
                None,
                test_payload(),
            )
            .await
            .unwrap_err();
        assert!(err.contains("500"), "unexpected error: {err}");
        // Initial attempt plus the single scheduled retry
        assert_eq!(webhook_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sharing_gate_requires_gdpr_result() {
        let (decision, blocked) = sharing_gate(None);
        assert_eq!(decision, None);
        assert!(blocked);
    }

    #[test]
    fn test_sharing_gate_blocks_delete_decision() {
        let body = json!({"gdprDecision": "delete"});
        let (decision, blocked) = sharing_gate(Some(&body));
        assert_eq!(decision, Some(GdprDecision::Delete));
        assert!(blocked);
    }

    #[test]
    fn test_sharing_gate_admits_allow_and_anonymize() {
        for raw in ["allow", "anonymize"] {
            let body = json!({"gdprDecision": raw});
            let (decision, blocked) = sharing_gate(Some(&body));
            assert!(decision.is_some());
            assert!(!blocked, "{raw} must not block sharing");
        }
    }

    #[test]
    fn test_sharing_gate_admits_result_without_decision() {
        let body = json!({"reviewed": true});
        let (decision, blocked) = sharing_gate(Some(&body));
        assert_eq!(decision, None);
        assert!(!blocked);
    }

    #[test]
    fn test_parse_gdpr_decision_variants() {
        assert_eq!(
            parse_gdpr_decision(&json!({"gdprDecision": "delete"})),
            Some(GdprDecision::Delete)
        );
        assert_eq!(
            parse_gdpr_decision(&json!({"decision": "Allow"})),
            Some(GdprDecision::Allow)
        );
        assert_eq!(parse_gdpr_decision(&json!({"gdprDecision": "??"})), None);
        assert_eq!(parse_gdpr_decision(&json!({})), None);
        assert_eq!(parse_gdpr_decision(&json!("delete")), None);
    }
}
