//! Upload-document metadata store.
//!
//! Implements the ingestion pipeline's metadata sink: one row per file at
//! store time, rewritten with the shared extraction outcome when the
//! batch settles.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ib_ingest::{MetadataSink, SinkError};
use ib_portal_types::UploadDocument;
use sqlx::PgPool;
use tracing::info;

const DOCUMENT_COLUMNS: &str = "doc_id, file_name, stored_name, content_hash, blob_url, \
     doc_category, doc_subcategory, transaction_type, extracted_json, reference_number, \
     status, error_detail, created_at";

/// Service for upload-document rows.
#[derive(Clone, Debug)]
pub struct DocumentMetadataService {
    pool: PgPool,
}

impl DocumentMetadataService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<UploadDocument>> {
        let results = sqlx::query_as::<_, UploadDocument>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM portal.upload_documents \
             ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list upload documents")?;

        Ok(results)
    }

    pub async fn find_by_reference(&self, reference: &str) -> Result<Vec<UploadDocument>> {
        let results = sqlx::query_as::<_, UploadDocument>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM portal.upload_documents \
             WHERE reference_number = $1 ORDER BY created_at DESC"
        ))
        .bind(reference)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch documents by reference")?;

        Ok(results)
    }

    async fn insert(&self, doc: &UploadDocument) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO portal.upload_documents (
                doc_id, file_name, stored_name, content_hash, blob_url,
                doc_category, doc_subcategory, transaction_type, extracted_json,
                reference_number, status, error_detail, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
            "#,
        )
        .bind(doc.doc_id)
        .bind(&doc.file_name)
        .bind(&doc.stored_name)
        .bind(&doc.content_hash)
        .bind(&doc.blob_url)
        .bind(&doc.doc_category)
        .bind(&doc.doc_subcategory)
        .bind(&doc.transaction_type)
        .bind(&doc.extracted_json)
        .bind(&doc.reference_number)
        .bind(&doc.status)
        .bind(&doc.error_detail)
        .execute(&self.pool)
        .await
        .context("Failed to insert upload document")?;

        info!(doc_id = %doc.doc_id, file = %doc.file_name, "recorded upload document");
        Ok(())
    }

    async fn update(&self, doc: &UploadDocument) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE portal.upload_documents
            SET doc_category = $2, doc_subcategory = $3, transaction_type = $4,
                extracted_json = $5, reference_number = $6, status = $7, error_detail = $8
            WHERE doc_id = $1
            "#,
        )
        .bind(doc.doc_id)
        .bind(&doc.doc_category)
        .bind(&doc.doc_subcategory)
        .bind(&doc.transaction_type)
        .bind(&doc.extracted_json)
        .bind(&doc.reference_number)
        .bind(&doc.status)
        .bind(&doc.error_detail)
        .execute(&self.pool)
        .await
        .context("Failed to finalize upload document")?;

        Ok(())
    }
}

#[async_trait]
impl MetadataSink for DocumentMetadataService {
    async fn record(&self, doc: &UploadDocument) -> Result<(), SinkError> {
        self.insert(doc).await.map_err(Into::into)
    }

    async fn finalize(&self, doc: &UploadDocument) -> Result<(), SinkError> {
        self.update(doc).await.map_err(Into::into)
    }
}
