//! Portal error taxonomy and its HTTP rendering.
//!
//! Everything a handler can fail with funnels into [`PortalError`], which
//! renders as the standard `{ success, data, error }` envelope with the
//! status the failure class deserves. Ineligible records and step misuse
//! are conflicts, bad input is unprocessable, a dead extraction or LLM
//! endpoint is a bad gateway. Plumbing failures stay generic for the
//! client and go to the log in full.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ib_ingest::IngestError;
use ib_workflow::{Ineligibility, WorkflowError};
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Ineligible(#[from] Ineligibility),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    WrongStep(String),

    #[error("{0}")]
    External(String),

    #[error("{0} is not configured")]
    Unavailable(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Ineligible(_) | Self::WrongStep(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WorkflowError> for PortalError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Ineligible(e) => Self::Ineligible(e),
            WorkflowError::Validation(msg) => Self::Validation(msg),
            WorkflowError::InvalidStep { .. } | WorkflowError::MissingSnapshot => {
                Self::WrongStep(err.to_string())
            }
            // Stored statuses are normalized on write; a parse failure
            // here means the row was edited out of band.
            WorkflowError::Status(e) => Self::Internal(e.into()),
        }
    }
}

impl From<IngestError> for PortalError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::EmptyBatch => Self::Validation(err.to_string()),
            IngestError::Unroutable(_) => Self::Validation(err.to_string()),
            IngestError::Extraction(_) | IngestError::MalformedResponse(_) => {
                Self::External(err.to_string())
            }
            IngestError::Blob(e) => Self::Internal(e.into()),
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Database(e) => {
                error!("database failure: {e:?}");
                "internal error".to_string()
            }
            Self::Internal(e) => {
                error!("unexpected failure: {e:?}");
                "internal error".to_string()
            }
            other => {
                warn!("request failed: {other}");
                other.to_string()
            }
        };

        let body = Json(serde_json::json!({
            "success": false,
            "data": null,
            "error": message,
        }));
        (status, body).into_response()
    }
}
