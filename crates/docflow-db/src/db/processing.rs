//! Processing record repository
//!
//! Owns the `documents` table. All status bookkeeping for a document goes
//! through here so the stage transition guard is enforced in one place.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{PgPool, Postgres};

use docflow_core::models::{
    GdprDocumentView, ProcessingRecord, ProcessingStatus, Stage, StageStatus,
};

const RECORD_COLUMNS: &str = r#"
    id, file_name, file_size, mime_type, user_id, department, sharing_emails,
    status, analysis_status, gdpr_status, sharing_status,
    analysis_result, gdpr_result, sharing_result, error,
    storage_key, storage_url, created_at, updated_at
"#;

/// Parameters for registering a new upload.
pub struct NewProcessingRecord<'a> {
    pub id: &'a str,
    pub file_name: &'a str,
    pub file_size: i64,
    pub mime_type: &'a str,
    pub user_id: Option<&'a str>,
    pub department: Option<&'a str>,
    pub sharing_emails: &'a [String],
    pub storage_key: &'a str,
    pub storage_url: &'a str,
}

#[derive(Clone)]
pub struct ProcessingRepository {
    pool: PgPool,
}

impl ProcessingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewProcessingRecord<'_>) -> Result<ProcessingRecord> {
        let now = Utc::now();
        let record = sqlx::query_as::<Postgres, ProcessingRecord>(&format!(
            r#"
            INSERT INTO documents (
                id, file_name, file_size, mime_type, user_id, department,
                sharing_emails, status, storage_key, storage_url,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9, $10, $10)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(new.file_name)
        .bind(new.file_size)
        .bind(new.mime_type)
        .bind(new.user_id)
        .bind(new.department)
        .bind(new.sharing_emails)
        .bind(new.storage_key)
        .bind(new.storage_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create processing record")?;
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ProcessingRecord>> {
        let record = sqlx::query_as::<Postgres, ProcessingRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM documents
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get processing record")?;
        Ok(record)
    }

    /// All records, newest first.
    pub async fn list_all(&self) -> Result<Vec<ProcessingRecord>> {
        let rows = sqlx::query_as::<Postgres, ProcessingRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM documents
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list processing records")?;
        Ok(rows)
    }

    pub async fn list_completed(&self, limit: i64) -> Result<Vec<ProcessingRecord>> {
        let rows = sqlx::query_as::<Postgres, ProcessingRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM documents
            WHERE status = 'completed'
            ORDER BY created_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list completed processing records")?;
        Ok(rows)
    }

    /// Move one stage to a new status, optionally recording its result or
    /// error. Returns `None` if the record does not exist or the transition
    /// is not allowed (the stage already settled).
    ///
    /// The transition guard lives in the UPDATE predicate itself: the row
    /// only changes when the stage is currently in a state the target status
    /// is reachable from. Both the pipeline and a result callback can race
    /// on the same stage; whichever commits first wins and the loser gets
    /// `None` instead of overwriting a terminal state.
    pub async fn update_stage(
        &self,
        id: &str,
        stage: Stage,
        status: StageStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<Option<ProcessingRecord>> {
        let (status_col, result_col) = match stage {
            Stage::Analysis => ("analysis_status", "analysis_result"),
            Stage::Gdpr => ("gdpr_status", "gdpr_result"),
            Stage::Sharing => ("sharing_status", "sharing_result"),
        };

        let record = sqlx::query_as::<Postgres, ProcessingRecord>(&format!(
            r#"
            UPDATE documents
            SET {status_col} = $2,
                {result_col} = COALESCE($3, {result_col}),
                error = COALESCE($4, error),
                updated_at = $5
            WHERE id = $1 AND {status_col} = ANY($6)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(result)
        .bind(error)
        .bind(Utc::now())
        .bind(StageStatus::transition_sources(status))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update stage status")?;

        if record.is_none() {
            if let Some(current) = self.get(id).await? {
                tracing::warn!(
                    processing_id = %id,
                    stage = %stage,
                    from = %current.stage_status(stage),
                    to = %status,
                    "Rejected stage transition"
                );
            }
        }
        Ok(record)
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: ProcessingStatus,
        error: Option<&str>,
    ) -> Result<Option<ProcessingRecord>> {
        let record = sqlx::query_as::<Postgres, ProcessingRecord>(&format!(
            r#"
            UPDATE documents
            SET status = $2,
                error = COALESCE($3, error),
                updated_at = $4
            WHERE id = $1
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(error)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to set processing status")?;
        Ok(record)
    }

    /// Listing for the GDPR dashboard. `has_analysis` filters on whether an
    /// analysis result was recorded.
    pub async fn gdpr_view(
        &self,
        limit: i64,
        has_analysis: Option<bool>,
    ) -> Result<Vec<GdprDocumentView>> {
        let rows = sqlx::query_as::<Postgres, GdprDocumentView>(
            r#"
            SELECT
                id AS processing_id,
                file_name,
                file_size,
                created_at,
                (analysis_result IS NOT NULL) AS has_analysis,
                (gdpr_result IS NOT NULL) AS has_gdpr_result,
                gdpr_result
            FROM documents
            WHERE ($2::boolean IS NULL OR (analysis_result IS NOT NULL) = $2)
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(has_analysis)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list GDPR document view")?;
        Ok(rows)
    }
}
