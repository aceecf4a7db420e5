//! Sharing request repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use docflow_core::models::{ApprovalStatus, SharingRecord};

#[derive(Clone)]
pub struct SharingRepository {
    pool: PgPool,
}

impl SharingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        processing_id: &str,
        recipients: &[String],
    ) -> Result<SharingRecord> {
        let record = sqlx::query_as::<Postgres, SharingRecord>(
            r#"
            INSERT INTO document_sharing (
                id, processing_id, recipients, approval_status, created_at
            )
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING id, processing_id, recipients, approval_status,
                approved_by, decided_at, result, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(processing_id)
        .bind(recipients)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to create sharing request")?;
        Ok(record)
    }

    pub async fn list_pending(&self) -> Result<Vec<SharingRecord>> {
        let rows = sqlx::query_as::<Postgres, SharingRecord>(
            r#"
            SELECT id, processing_id, recipients, approval_status,
                approved_by, decided_at, result, created_at
            FROM document_sharing
            WHERE approval_status = 'pending'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pending sharing requests")?;
        Ok(rows)
    }

    pub async fn list_for_processing(&self, processing_id: &str) -> Result<Vec<SharingRecord>> {
        let rows = sqlx::query_as::<Postgres, SharingRecord>(
            r#"
            SELECT id, processing_id, recipients, approval_status,
                approved_by, decided_at, result, created_at
            FROM document_sharing
            WHERE processing_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(processing_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list sharing requests for processing id")?;
        Ok(rows)
    }

    /// Record an approval decision. Only pending requests can be decided;
    /// returns `None` if the request is missing or already settled.
    pub async fn decide(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        approved_by: Option<&str>,
    ) -> Result<Option<SharingRecord>> {
        let record = sqlx::query_as::<Postgres, SharingRecord>(
            r#"
            UPDATE document_sharing
            SET approval_status = $2,
                approved_by = $3,
                decided_at = $4
            WHERE id = $1 AND approval_status = 'pending'
            RETURNING id, processing_id, recipients, approval_status,
                approved_by, decided_at, result, created_at
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(approved_by)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to decide sharing request")?;
        Ok(record)
    }

    pub async fn set_result(
        &self,
        id: Uuid,
        result: &serde_json::Value,
    ) -> Result<Option<SharingRecord>> {
        let record = sqlx::query_as::<Postgres, SharingRecord>(
            r#"
            UPDATE document_sharing
            SET result = $2
            WHERE id = $1
            RETURNING id, processing_id, recipients, approval_status,
                approved_by, decided_at, result, created_at
            "#,
        )
        .bind(id)
        .bind(result)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to set sharing result")?;
        Ok(record)
    }
}
