//! Processing record: the per-upload status/result object tracked for the
//! lifetime of a document.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::OnceLock;
use utoipa::ToSchema;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Overall status of one upload (matches database enum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "processing_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessingStatus::Pending => write!(f, "pending"),
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Completed => write!(f, "completed"),
            ProcessingStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Status of one delegated stage (matches database enum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "stage_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl StageStatus {
    pub const ALL: [StageStatus; 5] = [
        StageStatus::Pending,
        StageStatus::Processing,
        StageStatus::Completed,
        StageStatus::Failed,
        StageStatus::Skipped,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StageStatus::Completed | StageStatus::Failed | StageStatus::Skipped
        )
    }

    /// Stage transitions are monotonic forward:
    /// pending -> processing -> {completed | failed}, or pending -> skipped.
    /// Terminal states accept no further transitions, so a late result
    /// callback cannot resurrect a stage that already settled.
    pub fn can_transition_to(self, next: StageStatus) -> bool {
        match (self, next) {
            (StageStatus::Pending, StageStatus::Processing) => true,
            (StageStatus::Pending, StageStatus::Skipped) => true,
            (StageStatus::Processing, StageStatus::Completed) => true,
            (StageStatus::Processing, StageStatus::Failed) => true,
            // Result callbacks may settle a stage the pipeline never started.
            (StageStatus::Pending, StageStatus::Completed) => true,
            (StageStatus::Pending, StageStatus::Failed) => true,
            _ => false,
        }
    }

    /// States a stage may currently be in for a transition to `next` to
    /// hold. Used as the compare-and-set predicate when persisting a
    /// transition, so two concurrent writers (the pipeline and a result
    /// callback) cannot both settle the same stage.
    pub fn transition_sources(next: StageStatus) -> Vec<StageStatus> {
        Self::ALL
            .iter()
            .copied()
            .filter(|from| from.can_transition_to(next))
            .collect()
    }
}

impl Display for StageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StageStatus::Pending => write!(f, "pending"),
            StageStatus::Processing => write!(f, "processing"),
            StageStatus::Completed => write!(f, "completed"),
            StageStatus::Failed => write!(f, "failed"),
            StageStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// One of the three delegated stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Analysis,
    Gdpr,
    Sharing,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Analysis => "analysis",
            Stage::Gdpr => "gdpr",
            Stage::Sharing => "sharing",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Per-stage status map. Serializes with exactly the keys
/// `analysis`, `gdpr`, `sharing`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct StageStatuses {
    pub analysis: StageStatus,
    pub gdpr: StageStatus,
    pub sharing: StageStatus,
}

impl StageStatuses {
    pub fn get(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Analysis => self.analysis,
            Stage::Gdpr => self.gdpr,
            Stage::Sharing => self.sharing,
        }
    }
}

impl Default for StageStatuses {
    fn default() -> Self {
        Self {
            analysis: StageStatus::Pending,
            gdpr: StageStatus::Pending,
            sharing: StageStatus::Pending,
        }
    }
}

/// Per-stage result bag (whatever JSON the automation engine returned).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StageResults {
    pub analysis: Option<JsonValue>,
    pub gdpr: Option<JsonValue>,
    pub sharing: Option<JsonValue>,
}

/// Processing record (database row)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct ProcessingRecord {
    pub id: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub user_id: Option<String>,
    pub department: Option<String>,
    pub sharing_emails: Vec<String>,
    pub status: ProcessingStatus,
    pub analysis_status: StageStatus,
    pub gdpr_status: StageStatus,
    pub sharing_status: StageStatus,
    pub analysis_result: Option<JsonValue>,
    pub gdpr_result: Option<JsonValue>,
    pub sharing_result: Option<JsonValue>,
    pub error: Option<String>,
    pub storage_key: String,
    pub storage_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingRecord {
    pub fn steps(&self) -> StageStatuses {
        StageStatuses {
            analysis: self.analysis_status,
            gdpr: self.gdpr_status,
            sharing: self.sharing_status,
        }
    }

    pub fn stage_status(&self, stage: Stage) -> StageStatus {
        self.steps().get(stage)
    }
}

/// API response shape for status endpoints. Field names follow the wire
/// format the UI consumes (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRecordResponse {
    pub id: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub sharing_emails: Vec<String>,
    pub status: ProcessingStatus,
    pub steps: StageStatuses,
    pub results: StageResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProcessingRecord> for ProcessingRecordResponse {
    fn from(record: ProcessingRecord) -> Self {
        let steps = record.steps();
        ProcessingRecordResponse {
            id: record.id,
            file_name: record.file_name,
            file_size: record.file_size,
            mime_type: record.mime_type,
            user_id: record.user_id,
            department: record.department,
            sharing_emails: record.sharing_emails,
            status: record.status,
            steps,
            results: StageResults {
                analysis: record.analysis_result,
                gdpr: record.gdpr_result,
                sharing: record.sharing_result,
            },
            error: record.error,
            file_url: record.storage_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

const ID_SUFFIX_LEN: usize = 9;

/// Generate a processing id: `doc_<unix-millis>_<9 lowercase alphanumerics>`.
pub fn new_processing_id() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect();
    format!("doc_{}_{}", Utc::now().timestamp_millis(), suffix)
}

fn processing_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^doc_\d+_[a-z0-9]{9}$").expect("valid regex"))
}

/// Check whether a string looks like a generated processing id.
pub fn is_processing_id(s: &str) -> bool {
    processing_id_pattern().is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record(id: &str) -> ProcessingRecord {
        let now = Utc::now();
        ProcessingRecord {
            id: id.to_string(),
            file_name: "report.pdf".to_string(),
            file_size: 2048,
            mime_type: "application/pdf".to_string(),
            user_id: Some("user123".to_string()),
            department: Some("IT".to_string()),
            sharing_emails: vec!["a@example.com".to_string()],
            status: ProcessingStatus::Processing,
            analysis_status: StageStatus::Completed,
            gdpr_status: StageStatus::Processing,
            sharing_status: StageStatus::Pending,
            analysis_result: Some(serde_json::json!({"summary": "ok"})),
            gdpr_result: None,
            sharing_result: None,
            error: None,
            storage_key: "uploads/doc_1_abcdefghi/report.pdf".to_string(),
            storage_url: "http://localhost:5000/uploads/doc_1_abcdefghi/report.pdf".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_processing_id_shape() {
        let id = new_processing_id();
        assert!(is_processing_id(&id), "unexpected id: {}", id);
    }

    #[test]
    fn test_processing_ids_are_unique() {
        let a = new_processing_id();
        let b = new_processing_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_processing_id_rejects_malformed() {
        assert!(!is_processing_id("doc_123_SHOUTING1"));
        assert!(!is_processing_id("doc_abc_abcdefghi"));
        assert!(!is_processing_id("img_123_abcdefghi"));
        assert!(!is_processing_id("doc_123_short"));
    }

    #[test]
    fn test_stage_transitions_forward_only() {
        use StageStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Skipped));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Processing.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Skipped.can_transition_to(Processing));
    }

    #[test]
    fn test_transition_sources_exclude_terminal_states() {
        use StageStatus::*;
        assert_eq!(StageStatus::transition_sources(Processing), vec![Pending]);
        assert_eq!(StageStatus::transition_sources(Skipped), vec![Pending]);
        assert_eq!(
            StageStatus::transition_sources(Completed),
            vec![Pending, Processing]
        );
        assert_eq!(
            StageStatus::transition_sources(Failed),
            vec![Pending, Processing]
        );
        // A settled stage never matches a compare-and-set predicate, so a
        // late writer cannot overwrite an earlier terminal state.
        for target in StageStatus::ALL {
            let sources = StageStatus::transition_sources(target);
            assert!(!sources.iter().any(|s| s.is_terminal()), "{target}");
        }
    }

    #[test]
    fn test_steps_serialize_with_exact_keys() {
        let steps = StageStatuses::default();
        let value = serde_json::to_value(steps).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["analysis", "gdpr", "sharing"]);
        assert_eq!(obj["analysis"], "pending");
    }

    #[test]
    fn test_response_from_record() {
        let record = test_record("doc_1700000000000_abcdefghi");
        let response = ProcessingRecordResponse::from(record);
        assert_eq!(response.steps.analysis, StageStatus::Completed);
        assert_eq!(response.steps.gdpr, StageStatus::Processing);
        assert!(response.results.analysis.is_some());
        assert!(response.results.gdpr.is_none());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["fileName"], "report.pdf");
        assert_eq!(value["status"], "processing");
        assert!(value.get("steps").is_some());
    }
}
