//! HTTP client for the workflow automation engine.
//!
//! Two surfaces: webhook endpoints that run workflows (document analysis,
//! GDPR compliance, sharing) and the management REST API used to inspect
//! and activate workflows. Both authenticate with a single `X-Api-Key`
//! header when a key is configured.

pub mod client;

pub use client::{EngineClient, EngineResponse};
