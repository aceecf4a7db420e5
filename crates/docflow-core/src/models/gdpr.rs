use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Compliance decision returned by the GDPR workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "gdpr_decision", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum GdprDecision {
    Allow,
    Anonymize,
    Delete,
}

impl GdprDecision {
    /// A `delete` decision blocks the sharing stage entirely.
    pub fn blocks_sharing(self) -> bool {
        matches!(self, GdprDecision::Delete)
    }
}

impl Display for GdprDecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            GdprDecision::Allow => write!(f, "allow"),
            GdprDecision::Anonymize => write!(f, "anonymize"),
            GdprDecision::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for GdprDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(GdprDecision::Allow),
            "anonymize" => Ok(GdprDecision::Anonymize),
            "delete" => Ok(GdprDecision::Delete),
            other => Err(format!("unknown gdpr decision: {}", other)),
        }
    }
}

/// GDPR compliance result (database row)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct GdprComplianceResult {
    pub id: Uuid,
    pub processing_id: String,
    pub decision: GdprDecision,
    pub details: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// Row shape for the GDPR dashboard listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct GdprDocumentView {
    pub processing_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    pub has_analysis: bool,
    pub has_gdpr_result: bool,
    pub gdpr_result: Option<JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_round_trip_str() {
        for decision in [GdprDecision::Allow, GdprDecision::Anonymize, GdprDecision::Delete] {
            let parsed: GdprDecision = decision.to_string().parse().unwrap();
            assert_eq!(parsed, decision);
        }
        assert!("purge".parse::<GdprDecision>().is_err());
    }

    #[test]
    fn test_only_delete_blocks_sharing() {
        assert!(GdprDecision::Delete.blocks_sharing());
        assert!(!GdprDecision::Allow.blocks_sharing());
        assert!(!GdprDecision::Anonymize.blocks_sharing());
    }
}
