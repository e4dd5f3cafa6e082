//! Quotation endpoints.
//!
//! ## Endpoints
//!
//! - `POST /api/quotes` - save a draft under a generated temporary id
//! - `GET /api/quotes` - recent drafts
//! - `GET /api/quotes/:id` - one draft
//! - `POST /api/quotes/:id/convert` - bind the draft as a new business policy

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use ib_portal_types::{FieldMap, QuotationRecord, QuoteStatus};
use ib_workflow::{validate_submission, CommitRequest, SubmitOptions, TransactionKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{ok, ApiResponse, AppState};
use crate::error::PortalError;

#[derive(Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub fields: FieldMap,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ConvertResponse {
    pub temp_policy_id: String,
    pub policy_no: String,
}

pub async fn save_quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<ApiResponse<QuotationRecord>>, PortalError> {
    if req.fields.is_empty() {
        return Err(PortalError::validation("a quotation needs at least one field"));
    }
    Ok(ok(state.quotes.save_draft(&req.fields).await?))
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<QuotationRecord>>>, PortalError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    Ok(ok(state.quotes.list_recent(limit).await?))
}

pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<QuotationRecord>>, PortalError> {
    let quote = state
        .quotes
        .find(&id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("quotation {id}")))?;
    Ok(ok(quote))
}

/// Bind a draft: the stored payload goes through full new-business
/// validation and the same commit path as the manual flow, then the
/// draft is marked converted.
pub async fn convert_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ConvertResponse>>, PortalError> {
    let quote = state
        .quotes
        .find(&id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("quotation {id}")))?;

    let status = quote.quote_status().map_err(anyhow::Error::from)?;
    if status == QuoteStatus::Converted {
        return Err(PortalError::validation(format!(
            "quotation {id} has already been converted"
        )));
    }

    let fields: FieldMap =
        serde_json::from_value(quote.fields.clone()).map_err(anyhow::Error::from)?;
    let prepared = validate_submission(
        TransactionKind::NewBusiness,
        None,
        &fields,
        SubmitOptions::default(),
        Utc::now(),
    )?;

    let receipt = state
        .executor
        .apply(&CommitRequest {
            session_id: Uuid::new_v4(),
            kind: TransactionKind::NewBusiness,
            reference: None,
            fields: prepared.fields,
            changes: Vec::new(),
        })
        .await?;

    state.quotes.mark_converted(&id).await?;

    Ok(ok(ConvertResponse {
        temp_policy_id: id,
        policy_no: receipt.reference,
    }))
}
