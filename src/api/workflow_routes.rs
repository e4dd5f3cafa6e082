//! Transaction workflow endpoints.
//!
//! ## Endpoints
//!
//! - `POST /api/workflow` - start a session for a transaction kind
//! - `GET /api/workflow/:id` - current step, prefill and staged changes
//! - `POST /api/workflow/:id/fetch` - look up the record and open the edit form
//! - `POST /api/workflow/:id/submit` - validate, diff and commit (or stage a cancellation)
//! - `POST /api/workflow/:id/confirm` - second submit releasing a staged cancellation
//! - `POST /api/workflow/:id/back` - abandon the transaction and return to the start

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use ib_portal_types::FieldMap;
use ib_workflow::{
    check_claim_eligibility, check_policy_eligibility, FieldChange, SubmitOptions, SubmitOutcome,
    TransactionKind, WorkflowSession, WorkflowStep,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{ok, ApiResponse, AppState};
use crate::database::CommitReceipt;
use crate::error::PortalError;

#[derive(Deserialize)]
pub struct StartRequest {
    pub kind: TransactionKind,
}

#[derive(Deserialize)]
pub struct FetchRequest {
    pub reference: String,
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub options: SubmitOptions,
}

/// What the client renders: step, the form prefill, and any staged
/// cancellation changes awaiting the second submit.
#[derive(Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub kind: TransactionKind,
    pub step: WorkflowStep,
    pub reference: Option<String>,
    pub prefill: FieldMap,
    pub staged_changes: Option<Vec<FieldChange>>,
}

impl SessionView {
    pub(crate) fn of(session: &WorkflowSession) -> Self {
        Self {
            session_id: session.id,
            kind: session.kind,
            step: session.step,
            reference: session.reference.clone(),
            prefill: session.prefill.clone(),
            staged_changes: session.staged_changes().map(<[FieldChange]>::to_vec),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitResponse {
    NoChanges,
    ConfirmationRequired {
        changes: Vec<FieldChange>,
        warning: String,
    },
    Committed {
        receipt: CommitReceipt,
    },
}

pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<ApiResponse<SessionView>>, PortalError> {
    let session = WorkflowSession::start(req.kind);
    let view = SessionView::of(&session);
    state.sessions.insert(session).await;
    Ok(ok(view))
}

pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionView>>, PortalError> {
    let session = state.sessions.get(id).await?;
    Ok(ok(SessionView::of(&session)))
}

/// Look up the target record, gate it through the shared eligibility
/// checks and open the edit form. A failed lookup or an ineligible record
/// leaves the session at the fetch step.
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FetchRequest>,
) -> Result<Json<ApiResponse<SessionView>>, PortalError> {
    let session = state.sessions.get(id).await?;

    let reference = req.reference.trim().to_string();
    if reference.is_empty() {
        return Err(PortalError::validation("a policy or claim number is required"));
    }

    // Refresh lapse flags so eligibility judges the record as of today.
    state.policies.recompute_lapse_flags().await?;

    let snapshot = load_snapshot(&state, session.kind, &reference).await?;

    let view = state
        .sessions
        .mutate(id, move |s| {
            s.attach_snapshot(snapshot, Utc::now().date_naive())?;
            Ok(SessionView::of(s))
        })
        .await?;
    Ok(ok(view))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<ApiResponse<SubmitResponse>>, PortalError> {
    let outcome = state
        .sessions
        .mutate(id, |s| Ok(s.submit(&req.fields, req.options, Utc::now())?))
        .await?;

    let response = match outcome {
        SubmitOutcome::NoChanges => SubmitResponse::NoChanges,
        SubmitOutcome::ConfirmationRequired { changes, warning } => {
            SubmitResponse::ConfirmationRequired { changes, warning }
        }
        SubmitOutcome::Ready(request) => {
            let receipt = state.executor.apply(&request).await?;
            state
                .sessions
                .mutate(id, |s| {
                    s.complete();
                    Ok(())
                })
                .await?;
            SubmitResponse::Committed { receipt }
        }
    };

    Ok(ok(response))
}

/// Release a staged cancellation. The session keeps its staged state
/// until the write lands, so a store failure leaves it confirmable again.
pub async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SubmitResponse>>, PortalError> {
    let request = state.sessions.mutate(id, |s| Ok(s.confirm()?)).await?;

    let receipt = state.executor.apply(&request).await?;
    state
        .sessions
        .mutate(id, |s| {
            s.complete();
            Ok(())
        })
        .await?;

    Ok(ok(SubmitResponse::Committed { receipt }))
}

pub async fn back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionView>>, PortalError> {
    let view = state
        .sessions
        .mutate(id, |s| {
            s.back();
            Ok(SessionView::of(s))
        })
        .await?;
    Ok(ok(view))
}

/// Read the record a lookup transaction targets, applying the shared
/// eligibility predicates. Used by manual fetch and by document routing.
pub(crate) async fn load_snapshot(
    state: &AppState,
    kind: TransactionKind,
    reference: &str,
) -> Result<FieldMap, PortalError> {
    match kind {
        TransactionKind::MidTermAdjustment
        | TransactionKind::Renewal
        | TransactionKind::Cancellation
        | TransactionKind::NewClaim => {
            let policy = state
                .policies
                .find_by_policy_no(reference)
                .await?
                .ok_or_else(|| PortalError::not_found(format!("policy {reference}")))?;
            check_policy_eligibility(kind, &policy)?;
            Ok(policy.to_field_map())
        }
        TransactionKind::ClaimUpdate
        | TransactionKind::ClaimClose
        | TransactionKind::ClaimReopen => {
            let claim = state
                .claims
                .find_by_claim_no(reference)
                .await?
                .ok_or_else(|| PortalError::not_found(format!("claim {reference}")))?;
            let status = claim.status().map_err(anyhow::Error::from)?;
            check_claim_eligibility(kind, &claim.claim_no, status)?;
            Ok(claim.to_field_map())
        }
        _ => Err(PortalError::WrongStep(format!(
            "{} does not fetch an existing record",
            kind.tag()
        ))),
    }
}
