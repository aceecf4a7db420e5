//! Configuration module
//!
//! Environment-driven configuration for the gateway: database, storage,
//! automation-engine credentials, cache/queue tuning, and HTTP settings.

use std::env;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PORT: u16 = 5000;
const MAX_DOCUMENT_SIZE_MB: usize = 50;
const CACHE_TTL_SECONDS: u64 = 24 * 60 * 60;
pub const QUEUE_DISPATCH_DELAY_MS: u64 = 20_000;
pub const QUEUE_MAX_CONCURRENT: usize = 1;
const ENGINE_WEBHOOK_TIMEOUT_SECS: u64 = 30;
const ENGINE_API_TIMEOUT_SECS: u64 = 10;

/// Which storage backend to use for uploaded files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

impl StorageBackend {
    fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" => Ok(StorageBackend::S3),
            other => Err(anyhow::anyhow!(
                "STORAGE_BACKEND must be 'local' or 's3', got '{}'",
                other
            )),
        }
    }
}

/// Base HTTP/database configuration.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Full gateway configuration.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base: BaseConfig,
    pub database_url: String,
    /// Public base URL of this service; used to build download URLs the
    /// automation engine fetches files from.
    pub public_base_url: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    // Upload limits
    pub max_document_size_bytes: usize,
    pub document_allowed_extensions: Vec<String>,
    pub document_allowed_content_types: Vec<String>,
    // Automation engine
    pub engine_base_url: String,
    pub engine_api_key: Option<String>,
    pub engine_webhook_timeout_secs: u64,
    pub engine_api_timeout_secs: u64,
    pub analysis_webhook_path: String,
    pub gdpr_webhook_path: String,
    pub sharing_webhook_path: String,
    pub analysis_workflow_id: Option<String>,
    pub gdpr_workflow_id: Option<String>,
    pub sharing_workflow_id: Option<String>,
    // Result cache
    pub cache_dir: String,
    pub cache_ttl_seconds: u64,
    // Serial request queue
    pub queue_dispatch_delay_ms: u64,
    pub queue_max_concurrent: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<GatewayConfig>);

impl Config {
    fn inner(&self) -> &GatewayConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = GatewayConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate(self.is_production())
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn max_document_size_bytes(&self) -> usize {
        self.inner().max_document_size_bytes
    }

    pub fn document_allowed_extensions(&self) -> &[String] {
        &self.inner().document_allowed_extensions
    }

    pub fn document_allowed_content_types(&self) -> &[String] {
        &self.inner().document_allowed_content_types
    }

    pub fn engine_base_url(&self) -> &str {
        &self.inner().engine_base_url
    }

    pub fn engine_api_key(&self) -> Option<&str> {
        self.inner().engine_api_key.as_deref()
    }

    pub fn engine_webhook_timeout_secs(&self) -> u64 {
        self.inner().engine_webhook_timeout_secs
    }

    pub fn engine_api_timeout_secs(&self) -> u64 {
        self.inner().engine_api_timeout_secs
    }

    pub fn analysis_webhook_path(&self) -> &str {
        &self.inner().analysis_webhook_path
    }

    pub fn gdpr_webhook_path(&self) -> &str {
        &self.inner().gdpr_webhook_path
    }

    pub fn sharing_webhook_path(&self) -> &str {
        &self.inner().sharing_webhook_path
    }

    pub fn analysis_workflow_id(&self) -> Option<&str> {
        self.inner().analysis_workflow_id.as_deref()
    }

    pub fn gdpr_workflow_id(&self) -> Option<&str> {
        self.inner().gdpr_workflow_id.as_deref()
    }

    pub fn sharing_workflow_id(&self) -> Option<&str> {
        self.inner().sharing_workflow_id.as_deref()
    }

    pub fn cache_dir(&self) -> &str {
        &self.inner().cache_dir
    }

    pub fn cache_ttl_seconds(&self) -> u64 {
        self.inner().cache_ttl_seconds
    }

    pub fn queue_dispatch_delay_ms(&self) -> u64 {
        self.inner().queue_dispatch_delay_ms
    }

    pub fn queue_max_concurrent(&self) -> usize {
        self.inner().queue_max_concurrent
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = split_csv(&env_or("CORS_ORIGINS", "*"));

        let base = BaseConfig {
            server_port: env_or("PORT", &DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable must be set"))?;

        let engine_base_url = env::var("ENGINE_BASE_URL")
            .map_err(|_| anyhow::anyhow!("ENGINE_BASE_URL environment variable must be set"))?
            .trim_end_matches('/')
            .to_string();

        let server_port = base.server_port;
        let public_base_url = env_or(
            "PUBLIC_BASE_URL",
            &format!("http://localhost:{}", server_port),
        )
        .trim_end_matches('/')
        .to_string();

        let storage_backend = StorageBackend::parse(&env_or("STORAGE_BACKEND", "local"))?;

        let max_document_size_mb: usize =
            env_parse("MAX_DOCUMENT_SIZE_MB", MAX_DOCUMENT_SIZE_MB);

        let document_allowed_extensions = split_csv(&env_or(
            "DOCUMENT_ALLOWED_EXTENSIONS",
            "pdf,docx,xlsx,pptx,txt,jpg,jpeg,png,gif",
        ));

        let document_allowed_content_types = split_csv(&env_or(
            "DOCUMENT_ALLOWED_CONTENT_TYPES",
            "application/pdf,\
             application/vnd.openxmlformats-officedocument.wordprocessingml.document,\
             application/vnd.openxmlformats-officedocument.spreadsheetml.sheet,\
             application/vnd.openxmlformats-officedocument.presentationml.presentation,\
             text/plain,image/jpeg,image/png,image/gif",
        ));

        Ok(GatewayConfig {
            base,
            database_url,
            public_base_url,
            storage_backend,
            local_storage_path: env_or("LOCAL_STORAGE_PATH", "uploads"),
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION").or_else(|| env_opt("AWS_REGION")),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            max_document_size_bytes: max_document_size_mb * 1024 * 1024,
            document_allowed_extensions,
            document_allowed_content_types,
            engine_base_url,
            engine_api_key: env_opt("ENGINE_API_KEY"),
            engine_webhook_timeout_secs: env_parse(
                "ENGINE_WEBHOOK_TIMEOUT_SECONDS",
                ENGINE_WEBHOOK_TIMEOUT_SECS,
            ),
            engine_api_timeout_secs: env_parse(
                "ENGINE_API_TIMEOUT_SECONDS",
                ENGINE_API_TIMEOUT_SECS,
            ),
            analysis_webhook_path: env_or("ANALYSIS_WEBHOOK_PATH", "/webhook/document-analyzer"),
            gdpr_webhook_path: env_or("GDPR_WEBHOOK_PATH", "/webhook/gdpr-compliance"),
            sharing_webhook_path: env_or("SHARING_WEBHOOK_PATH", "/webhook/document-management"),
            analysis_workflow_id: env_opt("ENGINE_WORKFLOW_ID_ANALYSIS"),
            gdpr_workflow_id: env_opt("ENGINE_WORKFLOW_ID_GDPR"),
            sharing_workflow_id: env_opt("ENGINE_WORKFLOW_ID_SHARING"),
            cache_dir: env_or("CACHE_DIR", "cache/results"),
            cache_ttl_seconds: env_parse("CACHE_TTL_SECONDS", CACHE_TTL_SECONDS),
            queue_dispatch_delay_ms: env_parse(
                "QUEUE_DISPATCH_DELAY_MS",
                QUEUE_DISPATCH_DELAY_MS,
            ),
            queue_max_concurrent: env_parse("QUEUE_MAX_CONCURRENT", QUEUE_MAX_CONCURRENT).max(1),
        })
    }

    fn validate(&self, is_production: bool) -> Result<(), anyhow::Error> {
        if is_production && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.storage_backend == StorageBackend::S3 && self.s3_bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when STORAGE_BACKEND is 's3'"
            ));
        }

        if self.max_document_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_DOCUMENT_SIZE_MB must be positive"));
        }

        if !self.engine_base_url.starts_with("http://")
            && !self.engine_base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "ENGINE_BASE_URL must be an http(s) URL, got '{}'",
                self.engine_base_url
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            base: BaseConfig {
                server_port: 5000,
                cors_origins: vec!["*".to_string()],
                db_max_connections: 20,
                db_timeout_seconds: 30,
                environment: "development".to_string(),
            },
            database_url: "postgresql://localhost/docflow".to_string(),
            public_base_url: "http://localhost:5000".to_string(),
            storage_backend: StorageBackend::Local,
            local_storage_path: "uploads".to_string(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            max_document_size_bytes: 50 * 1024 * 1024,
            document_allowed_extensions: vec!["pdf".to_string()],
            document_allowed_content_types: vec!["application/pdf".to_string()],
            engine_base_url: "https://engine.example.com".to_string(),
            engine_api_key: None,
            engine_webhook_timeout_secs: 30,
            engine_api_timeout_secs: 10,
            analysis_webhook_path: "/webhook/document-analyzer".to_string(),
            gdpr_webhook_path: "/webhook/gdpr-compliance".to_string(),
            sharing_webhook_path: "/webhook/document-management".to_string(),
            analysis_workflow_id: None,
            gdpr_workflow_id: None,
            sharing_workflow_id: None,
            cache_dir: "cache/results".to_string(),
            cache_ttl_seconds: 86400,
            queue_dispatch_delay_ms: 20_000,
            queue_max_concurrent: 1,
        }
    }

    #[test]
    fn test_wildcard_cors_allowed_in_development() {
        let config = test_config();
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let config = test_config();
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn test_s3_backend_requires_bucket() {
        let mut config = test_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate(false).is_err());
        config.s3_bucket = Some("docflow-files".to_string());
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn test_engine_base_url_must_be_http() {
        let mut config = test_config();
        config.engine_base_url = "engine.example.com".to_string();
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(StorageBackend::parse("local").unwrap(), StorageBackend::Local);
        assert_eq!(StorageBackend::parse("S3").unwrap(), StorageBackend::S3);
        assert!(StorageBackend::parse("gcs").is_err());
    }
}
