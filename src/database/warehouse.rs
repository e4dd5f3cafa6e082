//! Guarded execution of agent-generated SQL.

use ib_agentic::guard_sql;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::info;

use crate::error::PortalError;

/// Runs read-only warehouse queries with a hard row cap. The guard runs
/// here, at the point where the statement text is interpolated, whatever
/// the caller already checked.
#[derive(Clone, Debug)]
pub struct WarehouseService {
    pool: PgPool,
    max_rows: i64,
}

impl WarehouseService {
    pub fn new(pool: PgPool, max_rows: i64) -> Self {
        Self { pool, max_rows }
    }

    /// Execute a guarded SELECT and return the rows as a JSON array. The
    /// statement runs as a subquery so the row cap and JSON shaping stay
    /// outside the generated text.
    pub async fn run_readonly(&self, sql: &str) -> Result<JsonValue, PortalError> {
        let safe = guard_sql(sql).map_err(|e| PortalError::validation(e.to_string()))?;

        let wrapped = format!(
            "SELECT COALESCE(json_agg(row_to_json(q)), '[]'::json) \
             FROM (SELECT * FROM ({safe}) raw LIMIT $1) q"
        );

        let rows: JsonValue = sqlx::query_scalar(&wrapped)
            .bind(self.max_rows)
            .fetch_one(&self.pool)
            .await?;

        let count = rows.as_array().map(|a| a.len()).unwrap_or(0);
        info!(rows = count, "warehouse query executed");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_never_reach_the_pool() {
        let service = WarehouseService::new(
            PgPool::connect_lazy("postgresql://localhost/x").unwrap(),
            50,
        );
        let err = service
            .run_readonly("DELETE FROM portal.policies")
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
    }
}
