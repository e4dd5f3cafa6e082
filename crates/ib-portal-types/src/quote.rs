//! Quotation (pre-bind) drafts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

use crate::status::{QuoteStatus, StatusParseError};

/// A draft policy keyed by a temporary id, convertible into a real policy
/// once bound. The form payload is carried whole as JSON until conversion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuotationRecord {
    pub temp_policy_id: String,
    pub status: String,
    pub fields: JsonValue,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl QuotationRecord {
    pub fn quote_status(&self) -> Result<QuoteStatus, StatusParseError> {
        self.status.parse()
    }
}
