//! Wire types exchanged with the automation engine. Field names are
//! camelCase because that is what the workflows read and write.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// File metadata embedded in a stage payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_url: String,
}

/// Payload POSTed to a stage webhook.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StagePayload {
    pub processing_id: String,
    pub file: FilePayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sharing_emails: Vec<String>,
    /// Analysis output, forwarded to downstream stages once available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_results: Option<JsonValue>,
    /// GDPR output, forwarded to the sharing stage once available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gdpr_results: Option<JsonValue>,
}

/// Body a workflow POSTs back to the result callback endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageResultCallback {
    pub processing_id: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub results: Option<JsonValue>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Workflow descriptor from the engine management API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EngineWorkflow {
    pub id: String,
    pub name: String,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_payload_wire_format() {
        let payload = StagePayload {
            processing_id: "doc_1700000000000_abcdefghi".to_string(),
            file: FilePayload {
                file_name: "report.pdf".to_string(),
                file_size: 2048,
                mime_type: "application/pdf".to_string(),
                file_url: "http://localhost:5000/uploads/doc_1700000000000_abcdefghi/report.pdf"
                    .to_string(),
            },
            user_id: Some("user123".to_string()),
            department: None,
            sharing_emails: vec![],
            analysis_results: Some(serde_json::json!({"summary": "ok"})),
            gdpr_results: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["processingId"], "doc_1700000000000_abcdefghi");
        assert_eq!(value["file"]["mimeType"], "application/pdf");
        assert_eq!(value["analysisResults"]["summary"], "ok");
        assert!(value.get("department").is_none());
        assert!(value.get("sharingEmails").is_none());
        assert!(value.get("gdprResults").is_none());
    }

    #[test]
    fn test_callback_tolerates_sparse_body() {
        let body = r#"{"processingId": "doc_1_abcdefghi"}"#;
        let callback: StageResultCallback = serde_json::from_str(body).unwrap();
        assert_eq!(callback.processing_id, "doc_1_abcdefghi");
        assert!(callback.success.is_none());
        assert!(callback.results.is_none());
    }
}
