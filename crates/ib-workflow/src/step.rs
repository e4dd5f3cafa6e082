//! Workflow steps.

use serde::{Deserialize, Serialize};

/// Where a workflow session currently sits. A session is created in
/// `SelectType`, advances through `Fetch` (lookup kinds only) into `Edit`,
/// and for cancellation passes through `AwaitingConfirmation` before the
/// commit is allowed. Commit and "no changes" both land back in
/// `SelectType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    SelectType,
    Fetch,
    Edit,
    AwaitingConfirmation,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectType => "select_type",
            Self::Fetch => "fetch",
            Self::Edit => "edit",
            Self::AwaitingConfirmation => "awaiting_confirmation",
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
