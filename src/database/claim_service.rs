//! Claim store operations.

use anyhow::{Context, Result};
use ib_portal_types::{get_str, keys, ClaimRecord, FieldMap};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::push_assignments;

const CLAIM_COLUMNS: &str = "claim_no, policy_no, accident_date, intimation_date, claim_amount, \
     approved_amount, claim_status, claim_stage, description, remarks, update_date, created_at";

fn claim_column(key: &str) -> Option<&'static str> {
    Some(match key {
        keys::ACCIDENT_DATE => "accident_date",
        keys::INTIMATION_DATE => "intimation_date",
        keys::CLAIM_AMOUNT => "claim_amount",
        keys::APPROVED_AMOUNT => "approved_amount",
        keys::CLAIM_STATUS => "claim_status",
        keys::CLAIM_STAGE => "claim_stage",
        keys::DESCRIPTION => "description",
        keys::REMARKS => "remarks",
        _ => return None,
    })
}

/// Service for claim rows.
#[derive(Clone, Debug)]
pub struct ClaimService {
    pool: PgPool,
}

impl ClaimService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_claim_no(&self, claim_no: &str) -> Result<Option<ClaimRecord>> {
        let result = sqlx::query_as::<_, ClaimRecord>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM portal.claims WHERE claim_no = $1"
        ))
        .bind(claim_no)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch claim")?;

        Ok(result)
    }

    pub async fn claims_for_policy(&self, policy_no: &str) -> Result<Vec<ClaimRecord>> {
        let results = sqlx::query_as::<_, ClaimRecord>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM portal.claims WHERE policy_no = $1 ORDER BY created_at DESC"
        ))
        .bind(policy_no)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch claims for policy")?;

        Ok(results)
    }

    /// Register a claim under the generated claim number. The prepared
    /// fields carry the parent policy number and the forced opening
    /// status and stage.
    pub async fn insert_new_claim(&self, claim_no: &str, fields: &FieldMap) -> Result<()> {
        let policy_no = get_str(fields, keys::POLICY_NO)
            .context("prepared claim fields are missing the policy number")?;

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (key, value) in fields {
            if let Some(column) = claim_column(key) {
                columns.push(column);
                values.push(super::typed_value(key, value)?);
            }
        }

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO portal.claims (claim_no, policy_no, update_date, created_at");
        for column in &columns {
            qb.push(", ");
            qb.push(*column);
        }
        qb.push(") VALUES (");
        qb.push_bind(claim_no.to_string());
        qb.push(", ");
        qb.push_bind(policy_no);
        qb.push(", NOW(), NOW()");
        for value in values {
            qb.push(", ");
            super::push_bind_value(&mut qb, value);
        }
        qb.push(")");

        qb.build()
            .execute(&self.pool)
            .await
            .context("Failed to insert claim")?;

        info!(claim_no, "registered new claim");
        Ok(())
    }

    /// Apply an update, closure or reopen commit to an existing claim.
    pub async fn apply_claim(&self, claim_no: &str, fields: &FieldMap) -> Result<bool> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE portal.claims SET update_date = NOW()");
        let pushed = push_assignments(
            &mut qb,
            fields,
            claim_column,
            &[keys::CLAIM_NO, keys::POLICY_NO],
        )?;
        if pushed == 0 {
            return Ok(false);
        }
        qb.push(" WHERE claim_no = ");
        qb.push_bind(claim_no.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .context("Failed to apply claim transaction")?;

        info!(claim_no, fields = pushed, "applied claim transaction");
        Ok(result.rows_affected() > 0)
    }
}
