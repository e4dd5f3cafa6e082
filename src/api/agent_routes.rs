//! Natural-language warehouse agent endpoint.
//!
//! ## Endpoints
//!
//! - `POST /api/agent/query` - question in, generated SQL and its rows out

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::api::{ok, ApiResponse, AppState};
use crate::error::PortalError;

#[derive(Deserialize)]
pub struct AgentRequest {
    pub question: String,
}

/// The generated SQL travels with the rows so the analyst can see what
/// actually ran.
#[derive(Serialize)]
pub struct AgentResponse {
    pub question: String,
    pub sql: String,
    pub rows: JsonValue,
    pub row_count: usize,
}

pub async fn query(
    State(state): State<AppState>,
    Json(req): Json<AgentRequest>,
) -> Result<Json<ApiResponse<AgentResponse>>, PortalError> {
    let question = req.question.trim().to_string();
    if question.is_empty() {
        return Err(PortalError::validation("a question is required"));
    }

    let generator = state
        .generator
        .as_ref()
        .ok_or(PortalError::Unavailable("the warehouse agent"))?;

    let sql = generator
        .generate(&question)
        .await
        .map_err(|e| PortalError::External(format!("SQL generation failed: {e}")))?;

    info!(%question, %sql, "agent generated warehouse SQL");

    let rows = state.warehouse.run_readonly(&sql).await?;
    let row_count = rows.as_array().map(|a| a.len()).unwrap_or(0);

    Ok(ok(AgentResponse {
        question,
        sql,
        rows,
        row_count,
    }))
}
