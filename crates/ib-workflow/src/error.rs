//! Workflow error taxonomy.
//!
//! Mirrors the portal's user-facing split: ineligible records and failed
//! validation keep the session where it is; only the caller decides how to
//! render them.

use ib_portal_types::StatusParseError;

use crate::step::WorkflowStep;

/// Why a fetched record may not enter the requested transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Ineligibility {
    #[error("policy {policy_no} is already cancelled")]
    PolicyCancelled { policy_no: String },

    #[error("policy {policy_no} is lapsed")]
    PolicyLapsed { policy_no: String },

    #[error("claim {claim_no} is closed and cannot be updated")]
    ClaimClosed { claim_no: String },

    #[error("claim {claim_no} is {status}: not closed and cannot be reopened")]
    ClaimNotClosed { claim_no: String, status: String },
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Ineligible(#[from] Ineligibility),

    #[error("{0}")]
    Validation(String),

    #[error("step {actual:?} cannot accept this action (expected {expected})")]
    InvalidStep {
        expected: &'static str,
        actual: WorkflowStep,
    },

    #[error("no record has been fetched for this workflow")]
    MissingSnapshot,

    #[error(transparent)]
    Status(#[from] StatusParseError),
}

impl WorkflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
