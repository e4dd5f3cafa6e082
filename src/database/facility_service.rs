//! Facility store operations.
//!
//! A facility and its insurer participation lines land together in one
//! transaction; ids follow the `FAC` sequence already on the books.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use ib_portal_types::{
    facility_id_for_sequence, facility_sequence, get_date, get_str, keys, FacilityRecord,
    FieldMap, InsurerLine,
};
use ib_workflow::PreparedLine;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Service for facility rows and their participation lines.
#[derive(Clone, Debug)]
pub struct FacilityService {
    pool: PgPool,
}

impl FacilityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_id(&self, facility_id: &str) -> Result<Option<FacilityRecord>> {
        let result = sqlx::query_as::<_, FacilityRecord>(
            "SELECT facility_id, facility_name, onboarding_date, created_at \
             FROM portal.facilities WHERE facility_id = $1",
        )
        .bind(facility_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch facility")?;

        Ok(result)
    }

    pub async fn list(&self) -> Result<Vec<FacilityRecord>> {
        let results = sqlx::query_as::<_, FacilityRecord>(
            "SELECT facility_id, facility_name, onboarding_date, created_at \
             FROM portal.facilities ORDER BY facility_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list facilities")?;

        Ok(results)
    }

    pub async fn lines_for(&self, facility_id: &str) -> Result<Vec<InsurerLine>> {
        let results = sqlx::query_as::<_, InsurerLine>(
            "SELECT line_id, facility_id, insurer_name, participation_pct, is_lead, created_at \
             FROM portal.facility_lines WHERE facility_id = $1 \
             ORDER BY participation_pct DESC, insurer_name",
        )
        .bind(facility_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch facility lines")?;

        Ok(results)
    }

    /// Next id in the `FAC` sequence: one past the highest on the books.
    pub async fn next_facility_id(&self) -> Result<String> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT facility_id FROM portal.facilities")
                .fetch_all(&self.pool)
                .await
                .context("Failed to read facility ids")?;

        let max_seq = ids.iter().filter_map(|id| facility_sequence(id)).max().unwrap_or(0);
        Ok(facility_id_for_sequence(max_seq + 1))
    }

    /// Insert a facility and its validated participation lines atomically.
    pub async fn onboard(
        &self,
        fields: &FieldMap,
        lines: &[PreparedLine],
        today: NaiveDate,
    ) -> Result<(FacilityRecord, Vec<InsurerLine>)> {
        let facility_name = get_str(fields, keys::FACILITY_NAME)
            .context("validated facility fields are missing the facility name")?;

        let record = FacilityRecord {
            facility_id: self.next_facility_id().await?,
            facility_name,
            onboarding_date: Some(get_date(fields, keys::ONBOARDING_DATE).unwrap_or(today)),
            created_at: None,
        };

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            "INSERT INTO portal.facilities (facility_id, facility_name, onboarding_date, created_at) \
             VALUES ($1, $2, $3, NOW())",
        )
        .bind(&record.facility_id)
        .bind(&record.facility_name)
        .bind(record.onboarding_date)
        .execute(&mut *tx)
        .await
        .context("Failed to insert facility")?;

        let mut inserted = Vec::with_capacity(lines.len());
        for line in lines {
            let row = InsurerLine {
                line_id: Uuid::new_v4(),
                facility_id: record.facility_id.clone(),
                insurer_name: line.insurer_name.clone(),
                participation_pct: line.participation_pct,
                is_lead: line.is_lead,
                created_at: None,
            };
            sqlx::query(
                "INSERT INTO portal.facility_lines \
                 (line_id, facility_id, insurer_name, participation_pct, is_lead, created_at) \
                 VALUES ($1, $2, $3, $4, $5, NOW())",
            )
            .bind(row.line_id)
            .bind(&row.facility_id)
            .bind(&row.insurer_name)
            .bind(row.participation_pct)
            .bind(row.is_lead)
            .execute(&mut *tx)
            .await
            .context("Failed to insert facility line")?;
            inserted.push(row);
        }

        tx.commit().await.context("Failed to commit facility onboarding")?;

        info!(
            facility_id = %record.facility_id,
            insurers = inserted.len(),
            "facility onboarded"
        );
        Ok((record, inserted))
    }
}
