//! Policy store operations.
//!
//! Commits arrive as prepared canonical field maps; the UPDATE and INSERT
//! statements are assembled per request from the column allow list below
//! with every value parameter-bound. The lapse sweep is the only place
//! `is_lapsed` is written.

use anyhow::{Context, Result};
use ib_portal_types::{get_str, keys, FieldMap, PolicyRecord};
use ib_workflow::TransactionKind;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::push_assignments;

const POLICY_COLUMNS: &str = "policy_no, customer_name, customer_email, customer_phone, address, \
     vehicle_make, vehicle_model, year_of_make, chassis_no, engine_no, reg_no, \
     driver_name, driver_dob, license_no, sum_insured, premium, premium2, \
     pol_eff_date, pol_expiry_date, pol_issue_date, cancellation_date, cancellation_reason, \
     transaction_type, broker_id, facility_id, is_cancelled, is_lapsed, update_date, created_at";

/// Canonical field key to policies column. Keys outside this list never
/// reach the SQL text.
fn policy_column(key: &str) -> Option<&'static str> {
    Some(match key {
        keys::CUSTOMER_NAME => "customer_name",
        keys::CUSTOMER_EMAIL => "customer_email",
        keys::CUSTOMER_PHONE => "customer_phone",
        keys::ADDRESS => "address",
        keys::VEHICLE_MAKE => "vehicle_make",
        keys::VEHICLE_MODEL => "vehicle_model",
        keys::YEAR_OF_MAKE => "year_of_make",
        keys::CHASSIS_NO => "chassis_no",
        keys::ENGINE_NO => "engine_no",
        keys::REG_NO => "reg_no",
        keys::DRIVER_NAME => "driver_name",
        keys::DRIVER_DOB => "driver_dob",
        keys::LICENSE_NO => "license_no",
        keys::SUM_INSURED => "sum_insured",
        keys::PREMIUM => "premium",
        keys::PREMIUM2 => "premium2",
        keys::POL_EFF_DATE => "pol_eff_date",
        keys::POL_EXPIRY_DATE => "pol_expiry_date",
        keys::POL_ISSUE_DATE => "pol_issue_date",
        keys::CANCELLATION_DATE => "cancellation_date",
        keys::CANCELLATION_REASON => "cancellation_reason",
        keys::BROKER_ID => "broker_id",
        keys::FACILITY_ID => "facility_id",
        _ => return None,
    })
}

/// Service for policy rows.
#[derive(Clone, Debug)]
pub struct PolicyService {
    pool: PgPool,
}

impl PolicyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_policy_no(&self, policy_no: &str) -> Result<Option<PolicyRecord>> {
        let result = sqlx::query_as::<_, PolicyRecord>(&format!(
            "SELECT {POLICY_COLUMNS} FROM portal.policies WHERE policy_no = $1"
        ))
        .bind(policy_no)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch policy")?;

        Ok(result)
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<PolicyRecord>> {
        let results = sqlx::query_as::<_, PolicyRecord>(&format!(
            "SELECT {POLICY_COLUMNS} FROM portal.policies ORDER BY update_date DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list policies")?;

        Ok(results)
    }

    /// Insert a new-business policy from a prepared field map.
    pub async fn insert_new_business(&self, fields: &FieldMap) -> Result<String> {
        let policy_no = get_str(fields, keys::POLICY_NO)
            .context("prepared fields are missing the policy number")?;

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (key, value) in fields {
            if key == keys::POLICY_NO {
                continue;
            }
            if let Some(column) = policy_column(key) {
                columns.push(column);
                values.push(super::typed_value(key, value)?);
            }
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO portal.policies (policy_no, transaction_type, is_cancelled, is_lapsed, \
             update_date, created_at",
        );
        for column in &columns {
            qb.push(", ");
            qb.push(*column);
        }
        qb.push(") VALUES (");
        qb.push_bind(policy_no.clone());
        qb.push(", ");
        qb.push_bind(TransactionKind::NewBusiness.tag());
        qb.push(", FALSE, FALSE, NOW(), NOW()");
        for value in values {
            qb.push(", ");
            super::push_bind_value(&mut qb, value);
        }
        qb.push(")");

        qb.build()
            .execute(&self.pool)
            .await
            .context("Failed to insert policy")?;

        info!(policy_no = %policy_no, "created new business policy");
        Ok(policy_no)
    }

    /// Apply an MTA or renewal commit: dynamic SET over the prepared
    /// fields plus the transaction-type and update-date stamps.
    pub async fn apply_transaction(
        &self,
        policy_no: &str,
        kind: TransactionKind,
        fields: &FieldMap,
    ) -> Result<bool> {
        let mut qb = self.update_builder(kind, fields)?;
        qb.push(" WHERE policy_no = ");
        qb.push_bind(policy_no.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .context("Failed to apply policy transaction")?;

        info!(
            policy_no,
            kind = kind.tag(),
            fields = fields.len(),
            "applied policy transaction"
        );
        Ok(result.rows_affected() > 0)
    }

    /// Apply a confirmed cancellation. Same dynamic update, with the
    /// cancelled flag raised; the prepared fields already carry the
    /// negative return premium and the cancellation date.
    pub async fn apply_cancellation(&self, policy_no: &str, fields: &FieldMap) -> Result<bool> {
        let mut qb = self.update_builder(TransactionKind::Cancellation, fields)?;
        qb.push(", is_cancelled = TRUE");
        qb.push(" WHERE policy_no = ");
        qb.push_bind(policy_no.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .context("Failed to apply cancellation")?;

        info!(policy_no, "policy cancelled");
        Ok(result.rows_affected() > 0)
    }

    /// One set-based pass flipping `is_lapsed` wherever the stored flag
    /// disagrees with today falling outside the policy period. Runs at
    /// boot and before every fetch.
    pub async fn recompute_lapse_flags(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE portal.policies
            SET is_lapsed = (
                pol_eff_date IS NOT NULL AND pol_expiry_date IS NOT NULL
                AND (CURRENT_DATE < pol_eff_date OR CURRENT_DATE > pol_expiry_date)
            )
            WHERE is_lapsed IS DISTINCT FROM (
                pol_eff_date IS NOT NULL AND pol_expiry_date IS NOT NULL
                AND (CURRENT_DATE < pol_eff_date OR CURRENT_DATE > pol_expiry_date)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to recompute lapse flags")?;

        if result.rows_affected() > 0 {
            info!(changed = result.rows_affected(), "lapse sweep updated policies");
        }
        Ok(result.rows_affected())
    }

    fn update_builder(
        &self,
        kind: TransactionKind,
        fields: &FieldMap,
    ) -> Result<QueryBuilder<'static, Postgres>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE portal.policies SET update_date = NOW(), transaction_type = ");
        qb.push_bind(kind.tag());
        push_assignments(&mut qb, fields, policy_column, &[keys::POLICY_NO])?;
        Ok(qb)
    }
}
