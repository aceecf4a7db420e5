use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Approval state for a sharing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "approval_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_decided(self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

impl Display for ApprovalStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Sharing request (database row)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct SharingRecord {
    pub id: Uuid,
    pub processing_id: String,
    pub recipients: Vec<String>,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub result: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// API shape for the approvals endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharingRecordResponse {
    pub id: Uuid,
    pub processing_id: String,
    pub recipients: Vec<String>,
    pub approval_status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl From<SharingRecord> for SharingRecordResponse {
    fn from(record: SharingRecord) -> Self {
        SharingRecordResponse {
            id: record.id,
            processing_id: record.processing_id,
            recipients: record.recipients,
            approval_status: record.approval_status,
            approved_by: record.approved_by,
            decided_at: record.decided_at,
            result: record.result,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_undecided() {
        assert!(!ApprovalStatus::Pending.is_decided());
        assert!(ApprovalStatus::Approved.is_decided());
        assert!(ApprovalStatus::Rejected.is_decided());
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let record = SharingRecord {
            id: Uuid::nil(),
            processing_id: "doc_1700000000000_abcdefghi".to_string(),
            recipients: vec!["a@example.com".to_string()],
            approval_status: ApprovalStatus::Pending,
            approved_by: None,
            decided_at: None,
            result: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(SharingRecordResponse::from(record)).unwrap();
        assert_eq!(value["approvalStatus"], "pending");
        assert_eq!(value["processingId"], "doc_1700000000000_abcdefghi");
        assert!(value.get("approvedBy").is_none());
    }
}
