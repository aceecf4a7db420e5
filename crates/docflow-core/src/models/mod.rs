pub mod engine;
pub mod gdpr;
pub mod processing;
pub mod sharing;

pub use engine::{EngineWorkflow, FilePayload, StagePayload, StageResultCallback};
pub use gdpr::{GdprComplianceResult, GdprDecision, GdprDocumentView};
pub use processing::{
    new_processing_id, ProcessingRecord, ProcessingRecordResponse, ProcessingStatus, Stage,
    StageResults, StageStatus, StageStatuses,
};
pub use sharing::{ApprovalStatus, SharingRecord, SharingRecordResponse};
