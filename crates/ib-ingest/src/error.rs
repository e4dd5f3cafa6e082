//! Ingestion error taxonomy.

use crate::blob_store::BlobStoreError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("blob storage failed: {0}")]
    Blob(#[from] BlobStoreError),

    #[error("extraction service failed: {0}")]
    Extraction(String),

    #[error("extraction response could not be read: {0}")]
    MalformedResponse(String),

    #[error("no files were supplied")]
    EmptyBatch,

    #[error("document could not be routed: {0}")]
    Unroutable(String),
}
