//! Document upload and routing endpoints.
//!
//! ## Endpoints
//!
//! - `POST /api/documents` - multipart upload; stores, extracts, routes and
//!   opens a pre-filled workflow session
//! - `GET /api/documents` - recent upload metadata rows
//!
//! An upload batch always leaves metadata rows behind, whatever happens
//! after extraction. When the routed record cannot be used (not found, or
//! ineligible for the routed transaction) the response still carries a
//! fresh session at the fetch step plus an advisory, so the user can
//! retarget the documents instead of losing them.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use chrono::Utc;
use ib_ingest::{FilePayload, RoutingDecision};
use ib_portal_types::{FieldMap, UploadDocument};
use ib_workflow::{TransactionKind, WorkflowSession};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::workflow_routes::{load_snapshot, SessionView};
use crate::api::{ok, ApiResponse, AppState};
use crate::error::PortalError;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// Per-file result of an upload.
#[derive(Serialize)]
pub struct DocumentSummary {
    pub doc_id: Uuid,
    pub file_name: String,
    pub stored_name: String,
    pub content_hash: String,
    pub status: String,
}

impl DocumentSummary {
    fn of(doc: &UploadDocument) -> Self {
        Self {
            doc_id: doc.doc_id,
            file_name: doc.file_name.clone(),
            stored_name: doc.stored_name.clone(),
            content_hash: doc.content_hash.clone(),
            status: doc.status.clone(),
        }
    }
}

/// Where the batch was routed.
#[derive(Serialize)]
pub struct RoutingView {
    pub kind: TransactionKind,
    pub transaction: &'static str,
    pub reference: Option<String>,
    pub prefill: FieldMap,
    pub insurer_lines: Vec<FieldMap>,
}

impl RoutingView {
    fn of(decision: &RoutingDecision) -> Self {
        Self {
            kind: decision.kind,
            transaction: decision.kind.tag(),
            reference: decision.reference.clone(),
            prefill: decision.prefill.clone(),
            insurer_lines: decision.insurer_lines.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub documents: Vec<DocumentSummary>,
    pub routing: RoutingView,
    pub session: SessionView,
    /// Set when the routed record could not be opened; the session is at
    /// fetch so the documents can be retargeted.
    pub advisory: Option<String>,
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, PortalError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PortalError::validation(format!("malformed multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| PortalError::validation(format!("failed to read {file_name}: {e}")))?;

        files.push(FilePayload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let outcome = state.pipeline.run(files).await?;

    let (session, advisory) = match routed_session(&state, &outcome.decision).await {
        Ok(view) => (view, None),
        Err(err @ (PortalError::NotFound(_) | PortalError::Ineligible(_))) => {
            let fallback = WorkflowSession::start(outcome.decision.kind);
            let view = SessionView::of(&fallback);
            state.sessions.insert(fallback).await;
            (view, Some(err.to_string()))
        }
        Err(other) => return Err(other),
    };

    Ok(ok(UploadResponse {
        documents: outcome.documents.iter().map(DocumentSummary::of).collect(),
        routing: RoutingView::of(&outcome.decision),
        session,
        advisory,
    }))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<UploadDocument>>>, PortalError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    Ok(ok(state.documents.list_recent(limit).await?))
}

/// Open a workflow session for a routing decision: fetch and gate the
/// target record where the kind needs one, then lay the extracted fields
/// over the form.
async fn routed_session(
    state: &AppState,
    decision: &RoutingDecision,
) -> Result<SessionView, PortalError> {
    let mut session = WorkflowSession::start(decision.kind);

    if decision.kind.requires_fetch() {
        match decision.reference.as_deref() {
            Some(reference) => {
                state.policies.recompute_lapse_flags().await?;
                let snapshot = load_snapshot(state, decision.kind, reference).await?;
                session.attach_snapshot(snapshot, Utc::now().date_naive())?;
            }
            // No reference extracted: hand back the fetch step untouched
            // and let the user supply one.
            None => {
                let view = SessionView::of(&session);
                state.sessions.insert(session).await;
                return Ok(view);
            }
        }
    }

    if !decision.prefill.is_empty() {
        session.overlay_prefill(&decision.prefill)?;
    }

    let view = SessionView::of(&session);
    state.sessions.insert(session).await;
    Ok(view)
}
