//! Transaction workflow engine for the broking portal.
//!
//! Pure state and rules: no storage, no HTTP. A [`WorkflowSession`] carries
//! one user's transaction from kind selection through fetch, edit and
//! confirmation, and hands the caller a [`CommitRequest`] to apply. The
//! eligibility checks in [`eligibility`] are the single gate shared by the
//! manual screens and the document ingestion path.

pub mod dates;
pub mod diff;
pub mod eligibility;
pub mod error;
pub mod kind;
pub mod mapping;
pub mod rules;
pub mod session;
pub mod step;

pub use dates::{roll_forward, roll_forward_one_year};
pub use diff::{compute_changes, FieldChange};
pub use eligibility::{check_claim_eligibility, check_policy_eligibility};
pub use error::{Ineligibility, WorkflowError};
pub use kind::TransactionKind;
pub use mapping::{
    always_included_fields, computed_fields, editable_fields, field_kind, immutable_fields,
    FieldKind,
};
pub use rules::{
    validate_facility_lines, validate_submission, InsurerShare, PreparedLine, PreparedSubmission,
    SubmitOptions, REOPEN_REASON,
};
pub use session::{CommitRequest, SubmitOutcome, WorkflowSession};
pub use step::WorkflowStep;
