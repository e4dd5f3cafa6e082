//! Quotation (pre-bind draft) store operations.

use anyhow::{Context, Result};
use chrono::Utc;
use ib_portal_types::{temp_policy_id, FieldMap, QuotationRecord, QuoteStatus};
use sqlx::PgPool;
use tracing::info;

const QUOTE_COLUMNS: &str = "temp_policy_id, status, fields, created_at, updated_at";

/// Service for quotation rows. The form payload travels whole as JSON
/// until conversion turns it into a policy.
#[derive(Clone, Debug)]
pub struct QuotationService {
    pool: PgPool,
}

impl QuotationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find(&self, temp_policy_id: &str) -> Result<Option<QuotationRecord>> {
        let result = sqlx::query_as::<_, QuotationRecord>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM portal.quotations WHERE temp_policy_id = $1"
        ))
        .bind(temp_policy_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch quotation")?;

        Ok(result)
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<QuotationRecord>> {
        let results = sqlx::query_as::<_, QuotationRecord>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM portal.quotations ORDER BY updated_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list quotations")?;

        Ok(results)
    }

    /// Save a new draft under a generated temporary id.
    pub async fn save_draft(&self, fields: &FieldMap) -> Result<QuotationRecord> {
        let record = QuotationRecord {
            temp_policy_id: temp_policy_id(Utc::now()),
            status: QuoteStatus::Draft.as_str().to_string(),
            fields: serde_json::to_value(fields).context("Failed to encode quotation fields")?,
            created_at: None,
            updated_at: None,
        };

        sqlx::query(
            "INSERT INTO portal.quotations (temp_policy_id, status, fields, created_at, updated_at) \
             VALUES ($1, $2, $3, NOW(), NOW())",
        )
        .bind(&record.temp_policy_id)
        .bind(&record.status)
        .bind(&record.fields)
        .execute(&self.pool)
        .await
        .context("Failed to insert quotation")?;

        info!(temp_policy_id = %record.temp_policy_id, "saved quotation draft");
        Ok(record)
    }

    /// Replace a draft's payload. Converted quotes are immutable.
    pub async fn update_draft(&self, temp_policy_id: &str, fields: &FieldMap) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE portal.quotations SET fields = $2, updated_at = NOW() \
             WHERE temp_policy_id = $1 AND status <> $3",
        )
        .bind(temp_policy_id)
        .bind(serde_json::to_value(fields).context("Failed to encode quotation fields")?)
        .bind(QuoteStatus::Converted.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to update quotation")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_converted(&self, temp_policy_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE portal.quotations SET status = $2, updated_at = NOW() \
             WHERE temp_policy_id = $1",
        )
        .bind(temp_policy_id)
        .bind(QuoteStatus::Converted.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to mark quotation converted")?;

        info!(temp_policy_id, "quotation converted");
        Ok(result.rows_affected() > 0)
    }
}
