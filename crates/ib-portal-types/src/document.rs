//! Upload-document metadata records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One metadata row per uploaded file. Files in the same batch share the
/// extracted payload and classification; hash, GUID and blob URL are per
/// file.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadDocument {
    pub doc_id: Uuid,
    pub file_name: String,
    pub stored_name: String,
    pub content_hash: String,
    pub blob_url: String,
    pub doc_category: Option<String>,
    pub doc_subcategory: Option<String>,
    pub transaction_type: Option<String>,
    pub extracted_json: Option<JsonValue>,
    pub reference_number: Option<String>,
    pub status: String,
    pub error_detail: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
