//! Docflow API Library
//!
//! This crate provides the HTTP handlers, the document processing pipeline,
//! and application setup.

// Module declarations
mod api_doc;
mod handlers;
mod services;

// Public modules
pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::pipeline::DocumentPipeline;
