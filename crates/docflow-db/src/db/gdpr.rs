//! GDPR compliance result repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use docflow_core::models::{GdprComplianceResult, GdprDecision};

#[derive(Clone)]
pub struct GdprResultRepository {
    pool: PgPool,
}

impl GdprResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        processing_id: &str,
        decision: GdprDecision,
        details: Option<&serde_json::Value>,
    ) -> Result<GdprComplianceResult> {
        let result = sqlx::query_as::<Postgres, GdprComplianceResult>(
            r#"
            INSERT INTO gdpr_compliance_results (id, processing_id, decision, details, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, processing_id, decision, details, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(processing_id)
        .bind(decision)
        .bind(details)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to create GDPR compliance result")?;
        Ok(result)
    }

    /// Latest compliance result for a processing id, if any.
    pub async fn get_by_processing_id(
        &self,
        processing_id: &str,
    ) -> Result<Option<GdprComplianceResult>> {
        let result = sqlx::query_as::<Postgres, GdprComplianceResult>(
            r#"
            SELECT id, processing_id, decision, details, created_at
            FROM gdpr_compliance_results
            WHERE processing_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(processing_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get GDPR compliance result")?;
        Ok(result)
    }
}
