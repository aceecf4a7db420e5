//! Core types for the docflow gateway: configuration, error taxonomy,
//! domain models, and input validation.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

pub use config::{BaseConfig, Config, GatewayConfig, StorageBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
