//! Service and repository construction
//!
//! Every shared component is built exactly once here and carried in
//! AppState; handlers never construct their own clients, queues, or caches.

use crate::services::pipeline::DocumentPipeline;
use crate::state::{AppState, DbState, DocumentConfig, EngineState};
use anyhow::{Context, Result};
use docflow_core::Config;
use docflow_db::{GdprResultRepository, ProcessingRepository, SharingRepository};
use docflow_engine::EngineClient;
use docflow_infra::{QueueConfig, ResultCache, RetryPolicy, SerialRequestQueue};
use docflow_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let documents = ProcessingRepository::new(pool.clone());
    let gdpr_results = GdprResultRepository::new(pool.clone());
    let sharing = SharingRepository::new(pool.clone());

    let engine_client = EngineClient::new(config).context("Failed to build engine client")?;

    let queue = SerialRequestQueue::new(QueueConfig {
        dispatch_delay: Duration::from_millis(config.queue_dispatch_delay_ms()),
        max_concurrent: config.queue_max_concurrent(),
    });

    let cache = ResultCache::new(
        config.cache_dir(),
        Duration::from_secs(config.cache_ttl_seconds()),
    )
    .await
    .context("Failed to initialize result cache")?;

    let pipeline = Arc::new(DocumentPipeline::new(
        documents.clone(),
        gdpr_results.clone(),
        sharing.clone(),
        engine_client.clone(),
        queue.clone(),
        cache.clone(),
        RetryPolicy::default(),
        config.clone(),
    ));

    tracing::info!(
        engine = %config.engine_base_url(),
        dispatch_delay_ms = config.queue_dispatch_delay_ms(),
        cache_ttl_secs = config.cache_ttl_seconds(),
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        db: DbState {
            pool,
            documents,
            gdpr_results,
            sharing,
        },
        documents: DocumentConfig {
            storage,
            max_file_size: config.max_document_size_bytes(),
            allowed_extensions: config.document_allowed_extensions().to_vec(),
            allowed_content_types: config.document_allowed_content_types().to_vec(),
        },
        engine: EngineState {
            client: engine_client,
            queue,
            cache,
            pipeline,
        },
        config: config.clone(),
        is_production: config.is_production(),
    }))
}
