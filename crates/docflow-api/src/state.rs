//! Application state and sub-state extractors.
//!
//! AppState is split into domain sub-states so handlers can extract only what
//! they need via Axum's `FromRef`, and to avoid a single god object with
//! duplicate repositories. Everything here is constructed once at startup.

use crate::services::pipeline::DocumentPipeline;
use docflow_core::Config;
use docflow_db::{GdprResultRepository, ProcessingRepository, SharingRepository};
use docflow_engine::EngineClient;
use docflow_infra::{ResultCache, SerialRequestQueue};
use docflow_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

// ----- Sub-state types -----

/// Database pool and repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub documents: ProcessingRepository,
    pub gdpr_results: GdprResultRepository,
    pub sharing: SharingRepository,
}

/// Storage backend plus upload limits and allowlists.
#[derive(Clone)]
pub struct DocumentConfig {
    pub storage: Arc<dyn Storage>,
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

/// Automation engine client, dispatch queue, result cache, and the pipeline
/// that ties them together.
#[derive(Clone)]
pub struct EngineState {
    pub client: EngineClient,
    pub queue: SerialRequestQueue,
    pub cache: ResultCache,
    pub pipeline: Arc<DocumentPipeline>,
}

// ----- AppState -----

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub documents: DocumentConfig,
    pub engine: EngineState,
    pub config: Config,
    pub is_production: bool,
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for DocumentConfig {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.documents.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for EngineState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.engine.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
