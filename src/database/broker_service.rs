//! Broker (TOBA) store operations.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use ib_portal_types::{
    derive_broker_id, get_date, get_decimal, get_str, keys, BrokerRecord, FieldMap,
};
use rust_decimal::prelude::ToPrimitive;
use sqlx::PgPool;
use tracing::info;

const BROKER_COLUMNS: &str = "broker_id, broker_name, fca_number, commission_pct, onboarding_date, \
     longevity_years, broker_type, market_access, delegated_authority, created_at";

/// Service for broker rows.
#[derive(Clone, Debug)]
pub struct BrokerService {
    pool: PgPool,
}

impl BrokerService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_fca(&self, fca_number: &str) -> Result<Option<BrokerRecord>> {
        let result = sqlx::query_as::<_, BrokerRecord>(&format!(
            "SELECT {BROKER_COLUMNS} FROM portal.brokers WHERE fca_number = $1"
        ))
        .bind(fca_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch broker by FCA number")?;

        Ok(result)
    }

    pub async fn find_by_id(&self, broker_id: &str) -> Result<Option<BrokerRecord>> {
        let result = sqlx::query_as::<_, BrokerRecord>(&format!(
            "SELECT {BROKER_COLUMNS} FROM portal.brokers WHERE broker_id = $1"
        ))
        .bind(broker_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch broker")?;

        Ok(result)
    }

    pub async fn list(&self) -> Result<Vec<BrokerRecord>> {
        let results = sqlx::query_as::<_, BrokerRecord>(&format!(
            "SELECT {BROKER_COLUMNS} FROM portal.brokers ORDER BY broker_name"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list brokers")?;

        Ok(results)
    }

    /// Onboard a broker from validated TOBA fields. A repeat submission
    /// for an FCA number already on the books returns the existing row
    /// unchanged; the boolean reports whether a row was created.
    pub async fn onboard(
        &self,
        fields: &FieldMap,
        today: NaiveDate,
    ) -> Result<(BrokerRecord, bool)> {
        let broker_name = get_str(fields, keys::BROKER_NAME)
            .context("validated TOBA fields are missing the broker name")?;
        let fca_number = get_str(fields, keys::FCA_NUMBER)
            .context("validated TOBA fields are missing the FCA number")?;

        if let Some(existing) = self.find_by_fca(&fca_number).await? {
            info!(
                broker_id = %existing.broker_id,
                fca_number = %fca_number,
                "broker already onboarded, returning existing record"
            );
            return Ok((existing, false));
        }

        let record = BrokerRecord {
            broker_id: derive_broker_id(&broker_name, &fca_number),
            broker_name,
            fca_number,
            commission_pct: get_decimal(fields, keys::COMMISSION_PCT),
            onboarding_date: Some(get_date(fields, keys::ONBOARDING_DATE).unwrap_or(today)),
            longevity_years: get_decimal(fields, keys::LONGEVITY_YEARS).and_then(|d| d.to_i32()),
            broker_type: get_str(fields, keys::BROKER_TYPE),
            market_access: get_str(fields, keys::MARKET_ACCESS),
            delegated_authority: flag(fields, keys::DELEGATED_AUTHORITY),
            created_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO portal.brokers (
                broker_id, broker_name, fca_number, commission_pct, onboarding_date,
                longevity_years, broker_type, market_access, delegated_authority, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            "#,
        )
        .bind(&record.broker_id)
        .bind(&record.broker_name)
        .bind(&record.fca_number)
        .bind(record.commission_pct)
        .bind(record.onboarding_date)
        .bind(record.longevity_years)
        .bind(&record.broker_type)
        .bind(&record.market_access)
        .bind(record.delegated_authority)
        .execute(&self.pool)
        .await
        .context("Failed to insert broker")?;

        info!(broker_id = %record.broker_id, "broker onboarded");
        Ok((record, true))
    }
}

/// Checkbox-style fields arrive as booleans or yes/no text.
fn flag(fields: &FieldMap, key: &str) -> bool {
    match fields.get(key) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => {
            matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "y" | "1")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flags_accept_bools_and_yes_no_text() {
        let mut fields = FieldMap::new();
        fields.insert(keys::DELEGATED_AUTHORITY.into(), json!("Yes"));
        assert!(flag(&fields, keys::DELEGATED_AUTHORITY));

        fields.insert(keys::DELEGATED_AUTHORITY.into(), json!(false));
        assert!(!flag(&fields, keys::DELEGATED_AUTHORITY));

        assert!(!flag(&fields, "MISSING"));
    }
}
