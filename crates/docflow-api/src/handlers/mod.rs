pub mod approvals;
pub mod callbacks;
pub mod engine_workflows;
pub mod files;
pub mod gdpr;
pub mod health;
pub mod process;
pub mod status;
