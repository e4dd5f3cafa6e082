//! One user's in-flight transaction.
//!
//! A session walks select_type -> fetch -> edit -> commit, with an extra
//! confirmation stop for cancellations only. Every mutation either
//! transitions cleanly or returns an error that leaves the session exactly
//! where it was. A commit is handed back as a [`CommitRequest`]; the
//! session resets only when the caller reports the store accepted it, so a
//! failed write can be retried with nothing lost.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use ib_portal_types::{format_portal_date, get_str, keys, FieldMap};

use crate::dates::roll_forward_one_year;
use crate::diff::{compute_changes, FieldChange};
use crate::error::WorkflowError;
use crate::kind::TransactionKind;
use crate::mapping::computed_fields;
use crate::rules::{validate_submission, PreparedSubmission, SubmitOptions};
use crate::step::WorkflowStep;

/// What a successful submit produced.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Every entered value matched the record; nothing was written and the
    /// session has returned to the start.
    NoChanges,
    /// Cancellation only: the pending-confirmation flag is now set and the
    /// user must submit once more.
    ConfirmationRequired {
        changes: Vec<FieldChange>,
        warning: String,
    },
    /// Changes are ready to write. Apply them, then call
    /// [`WorkflowSession::complete`].
    Ready(CommitRequest),
}

/// Everything the store needs to apply a confirmed transaction.
#[derive(Debug, Clone, Serialize)]
pub struct CommitRequest {
    pub session_id: Uuid,
    pub kind: TransactionKind,
    /// Policy or claim number the transaction targets, when one was fetched.
    pub reference: Option<String>,
    pub fields: FieldMap,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone)]
struct Pending {
    prepared: FieldMap,
    changes: Vec<FieldChange>,
}

#[derive(Debug, Clone)]
pub struct WorkflowSession {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub step: WorkflowStep,
    /// Record key captured at fetch time.
    pub reference: Option<String>,
    /// The record as read from the store, untouched by edits.
    pub snapshot: Option<FieldMap>,
    /// What the edit form opens with: snapshot plus any computed or
    /// extracted overlays.
    pub prefill: FieldMap,
    pending: Option<Pending>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowSession {
    /// Begin a transaction of the given kind. Kinds that target an
    /// existing record open at fetch; creation flows go straight to edit.
    pub fn start(kind: TransactionKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            step: entry_step(kind),
            reference: None,
            snapshot: None,
            prefill: FieldMap::new(),
            pending: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Load the fetched record into the session and advance to edit.
    ///
    /// Eligibility must already have been established by the caller; this
    /// only shapes the form. A renewal's prefill rolls the policy period
    /// forward a year and stamps the issue date with `today`.
    pub fn attach_snapshot(
        &mut self,
        snapshot: FieldMap,
        today: NaiveDate,
    ) -> Result<(), WorkflowError> {
        self.expect_step(WorkflowStep::Fetch, "fetch")?;

        // A claim snapshot carries both numbers; the claim one is the target.
        self.reference = if self.kind.is_claim_transaction() {
            get_str(&snapshot, keys::CLAIM_NO)
        } else {
            get_str(&snapshot, keys::POLICY_NO)
        };

        let mut prefill = snapshot.clone();
        if self.kind == TransactionKind::Renewal {
            for key in [keys::POL_EFF_DATE, keys::POL_EXPIRY_DATE] {
                if let Some(current) = get_str(&prefill, key) {
                    prefill.insert(key.to_string(), json!(roll_forward_one_year(&current)));
                }
            }
            prefill.insert(
                keys::POL_ISSUE_DATE.to_string(),
                json!(format_portal_date(today)),
            );
        }

        self.snapshot = Some(snapshot);
        self.prefill = prefill;
        self.step = WorkflowStep::Edit;
        self.touch();
        Ok(())
    }

    /// Lay extracted document fields over the prefill. Extracted values
    /// win; the snapshot itself is left alone so the diff still runs
    /// against what the store holds.
    pub fn overlay_prefill(&mut self, fields: &FieldMap) -> Result<(), WorkflowError> {
        self.expect_step(WorkflowStep::Edit, "edit")?;
        for (k, v) in fields {
            self.prefill.insert(k.clone(), v.clone());
        }
        self.touch();
        Ok(())
    }

    /// Validate the edit form and stage or release a commit.
    ///
    /// No changes resets the session without a write. A cancellation's
    /// first submit only sets the pending-confirmation flag; anything else
    /// with changes comes back as [`SubmitOutcome::Ready`]. Validation
    /// failures leave the session in edit with nothing recorded.
    pub fn submit(
        &mut self,
        edits: &FieldMap,
        opts: SubmitOptions,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome, WorkflowError> {
        self.expect_step(WorkflowStep::Edit, "edit")?;
        if self.kind.requires_fetch() && self.snapshot.is_none() {
            return Err(WorkflowError::MissingSnapshot);
        }

        let PreparedSubmission { mut fields } =
            validate_submission(self.kind, self.snapshot.as_ref(), edits, opts, now)?;

        // Computed fields come from the prefill, never from the form.
        for key in computed_fields(self.kind) {
            if let Some(value) = self.prefill.get(*key) {
                fields.insert((*key).to_string(), value.clone());
            }
        }

        let empty = FieldMap::new();
        let snapshot = self.snapshot.as_ref().unwrap_or(&empty);
        let changes = compute_changes(self.kind, snapshot, &fields);

        if changes.is_empty() {
            tracing::info!(session = %self.id, kind = self.kind.tag(), "submit with no changes");
            self.reset();
            return Ok(SubmitOutcome::NoChanges);
        }

        if self.kind.needs_double_confirmation() {
            let warning = self.cancellation_warning();
            self.pending = Some(Pending {
                prepared: fields,
                changes: changes.clone(),
            });
            self.step = WorkflowStep::AwaitingConfirmation;
            self.touch();
            tracing::info!(session = %self.id, "cancellation staged, awaiting second submit");
            return Ok(SubmitOutcome::ConfirmationRequired { changes, warning });
        }

        self.touch();
        tracing::info!(
            session = %self.id,
            kind = self.kind.tag(),
            changed = changes.len(),
            "submission ready to commit"
        );
        Ok(SubmitOutcome::Ready(self.commit_request(fields, changes)))
    }

    /// The second submit of a staged cancellation. Only valid while the
    /// pending-confirmation flag is set.
    pub fn confirm(&mut self) -> Result<CommitRequest, WorkflowError> {
        self.expect_step(WorkflowStep::AwaitingConfirmation, "awaiting_confirmation")?;
        let pending = self
            .pending
            .as_ref()
            .ok_or(WorkflowError::MissingSnapshot)?;
        let request = self.commit_request(pending.prepared.clone(), pending.changes.clone());
        self.touch();
        Ok(request)
    }

    /// Mark a released commit as applied and reset for the next
    /// transaction.
    pub fn complete(&mut self) {
        tracing::info!(session = %self.id, kind = self.kind.tag(), "transaction committed");
        self.reset();
    }

    /// Abandon the current transaction: clears all transient state and
    /// returns to the start, whatever the current step.
    pub fn back(&mut self) {
        self.reset();
    }

    /// Re-enter the flow with a different transaction kind.
    pub fn restart(&mut self, kind: TransactionKind) {
        self.kind = kind;
        self.reset();
        self.step = entry_step(kind);
        self.touch();
    }

    pub fn staged_changes(&self) -> Option<&[FieldChange]> {
        self.pending.as_ref().map(|p| p.changes.as_slice())
    }

    fn commit_request(&self, fields: FieldMap, changes: Vec<FieldChange>) -> CommitRequest {
        CommitRequest {
            session_id: self.id,
            kind: self.kind,
            reference: self.reference.clone(),
            fields,
            changes,
        }
    }

    fn cancellation_warning(&self) -> String {
        let target = self.reference.as_deref().unwrap_or("this policy");
        format!("Cancelling {target} is irreversible once committed. Submit again to confirm.")
    }

    fn reset(&mut self) {
        self.reference = None;
        self.snapshot = None;
        self.prefill = FieldMap::new();
        self.pending = None;
        self.step = WorkflowStep::SelectType;
        self.touch();
    }

    fn expect_step(
        &self,
        expected: WorkflowStep,
        name: &'static str,
    ) -> Result<(), WorkflowError> {
        if self.step != expected {
            return Err(WorkflowError::InvalidStep {
                expected: name,
                actual: self.step,
            });
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn entry_step(kind: TransactionKind) -> WorkflowStep {
    if kind.requires_fetch() {
        WorkflowStep::Fetch
    } else {
        WorkflowStep::Edit
    }
}
