//! End-to-end ingestion of one upload batch.
//!
//! The sequence is fixed: hash and store every file, send the whole batch
//! to extraction in a single call, normalize and route, then finalize one
//! metadata row per file. All rows in a batch share the extracted payload
//! and classification; hash, id and blob URL are per file. Metadata write
//! failures are reported per file and never abort the rest of the batch.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use ib_portal_types::{FieldMap, UploadDocument, UploadStatus};

use crate::blob_store::{BlobMetadata, BlobStore};
use crate::error::IngestError;
use crate::extraction::{ExtractionResponse, Extractor, FilePayload};
use crate::identity::{content_sha256, storage_key, stored_file_name};
use crate::router::{route, sniff_kind, RoutingDecision};

/// What to do when the extraction call itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionFallback {
    /// Fail the whole batch; every row is marked Error.
    #[default]
    Abort,
    /// Sniff a document type from the file names and continue with an
    /// empty placeholder payload.
    FilenameSniff,
}

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Where metadata rows go. Backed by the documents table in production
/// and by an in-memory recorder in tests.
#[async_trait]
pub trait MetadataSink: Send + Sync {
    /// Insert a freshly stored upload, status Processing.
    async fn record(&self, doc: &UploadDocument) -> Result<(), SinkError>;

    /// Rewrite the row with its post-extraction state.
    async fn finalize(&self, doc: &UploadDocument) -> Result<(), SinkError>;
}

/// Result of a successfully routed batch.
#[derive(Debug)]
pub struct IngestOutcome {
    pub documents: Vec<UploadDocument>,
    pub decision: RoutingDecision,
}

pub struct IngestPipeline {
    blob: Arc<dyn BlobStore>,
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn MetadataSink>,
    fallback: ExtractionFallback,
}

impl IngestPipeline {
    pub fn new(
        blob: Arc<dyn BlobStore>,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn MetadataSink>,
    ) -> Self {
        Self {
            blob,
            extractor,
            sink,
            fallback: ExtractionFallback::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: ExtractionFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub async fn run(&self, files: Vec<FilePayload>) -> Result<IngestOutcome, IngestError> {
        if files.is_empty() {
            return Err(IngestError::EmptyBatch);
        }

        let mut documents = Vec::with_capacity(files.len());
        for file in &files {
            let now = Utc::now();
            let hash = content_sha256(&file.bytes);
            let stored = stored_file_name(&file.file_name, &hash, now);
            let key = storage_key(&stored, now);
            let metadata = BlobMetadata::from([
                ("file_name".to_string(), file.file_name.clone()),
                ("content_hash".to_string(), hash.clone()),
            ]);
            let blob_url = self
                .blob
                .store(&key, &file.bytes, &file.content_type, &metadata)
                .await?;

            let doc = UploadDocument {
                doc_id: Uuid::new_v4(),
                file_name: file.file_name.clone(),
                stored_name: stored,
                content_hash: hash,
                blob_url,
                doc_category: None,
                doc_subcategory: None,
                transaction_type: None,
                extracted_json: None,
                reference_number: None,
                status: UploadStatus::Processing.as_str().to_string(),
                error_detail: None,
                created_at: Some(now),
            };
            if let Err(e) = self.sink.record(&doc).await {
                tracing::warn!(file = %doc.file_name, error = %e, "metadata insert failed");
            }
            documents.push(doc);
        }

        let (response, decision) = match self.extractor.extract(&files).await {
            Ok(response) => match route(&response) {
                Ok(decision) => (response, decision),
                Err(e) => {
                    self.fail_batch(&mut documents, &e.to_string()).await;
                    return Err(e);
                }
            },
            Err(e) => match self.fallback {
                ExtractionFallback::Abort => {
                    self.fail_batch(&mut documents, &e.to_string()).await;
                    return Err(e);
                }
                ExtractionFallback::FilenameSniff => {
                    match files.iter().find_map(|f| sniff_kind(&f.file_name)) {
                        Some(kind) => {
                            tracing::warn!(error = %e, kind = kind.tag(), "extraction failed, type sniffed from file name");
                            let placeholder = ExtractionResponse {
                                legacy_type: Some(kind.tag().to_string()),
                                ..Default::default()
                            };
                            let decision = RoutingDecision {
                                kind,
                                reference: None,
                                prefill: FieldMap::new(),
                                insurer_lines: Vec::new(),
                            };
                            (placeholder, decision)
                        }
                        None => {
                            self.fail_batch(&mut documents, &e.to_string()).await;
                            return Err(e);
                        }
                    }
                }
            },
        };

        let payload = serde_json::Value::Object(response.extracted_fields.clone());
        let (category, subcategory) = match &response.classification {
            Some(c) => (Some(c.category.clone()), c.subcategory.clone()),
            None => (response.legacy_type.clone(), None),
        };
        for doc in &mut documents {
            doc.doc_category = category.clone();
            doc.doc_subcategory = subcategory.clone();
            doc.transaction_type = Some(decision.kind.tag().to_string());
            doc.extracted_json = Some(payload.clone());
            doc.reference_number = decision.reference.clone();
            doc.status = UploadStatus::Completed.as_str().to_string();
            if let Err(e) = self.sink.finalize(doc).await {
                tracing::warn!(file = %doc.file_name, error = %e, "metadata finalize failed");
            }
        }

        tracing::info!(
            files = documents.len(),
            kind = decision.kind.tag(),
            "ingestion batch completed"
        );
        Ok(IngestOutcome {
            documents,
            decision,
        })
    }

    async fn fail_batch(&self, documents: &mut [UploadDocument], detail: &str) {
        for doc in documents.iter_mut() {
            doc.status = UploadStatus::Error.as_str().to_string();
            doc.error_detail = Some(detail.to_string());
            if let Err(e) = self.sink.finalize(doc).await {
                tracing::warn!(file = %doc.file_name, error = %e, "metadata finalize failed");
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::InMemoryBlobStore;
    use crate::extraction::{Classification, StaticExtractor};
    use ib_workflow::TransactionKind;
    use serde_json::json;
    use tokio::sync::Mutex;

    struct RecordingSink {
        records: Mutex<Vec<UploadDocument>>,
        finals: Mutex<Vec<UploadDocument>>,
        fail_inserts: bool,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                finals: Mutex::new(Vec::new()),
                fail_inserts: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_inserts: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl MetadataSink for RecordingSink {
        async fn record(&self, doc: &UploadDocument) -> Result<(), SinkError> {
            if self.fail_inserts {
                return Err("insert refused".into());
            }
            self.records.lock().await.push(doc.clone());
            Ok(())
        }

        async fn finalize(&self, doc: &UploadDocument) -> Result<(), SinkError> {
            self.finals.lock().await.push(doc.clone());
            Ok(())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl Extractor for FailingExtractor {
        async fn extract(&self, _files: &[FilePayload]) -> Result<ExtractionResponse, IngestError> {
            Err(IngestError::Extraction("connection refused".into()))
        }
    }

    fn batch() -> Vec<FilePayload> {
        vec![
            FilePayload {
                file_name: "schedule.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: b"%PDF-1.4 one".to_vec(),
            },
            FilePayload {
                file_name: "endorsement.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: b"%PDF-1.4 two".to_vec(),
            },
        ]
    }

    fn mta_response() -> ExtractionResponse {
        ExtractionResponse {
            classification: Some(Classification {
                category: "Policy".into(),
                subcategory: Some("MTA".into()),
            }),
            extracted_fields: json!({"Policy Number": "POL100", "Premium": "£450"})
                .as_object()
                .cloned()
                .unwrap(),
            ..Default::default()
        }
    }

    fn pipeline(sink: Arc<RecordingSink>, extractor: Arc<dyn Extractor>) -> IngestPipeline {
        IngestPipeline::new(Arc::new(InMemoryBlobStore::new()), extractor, sink)
    }

    #[tokio::test]
    async fn batch_rows_share_payload_but_not_identity() {
        let sink = Arc::new(RecordingSink::new());
        let p = pipeline(sink.clone(), Arc::new(StaticExtractor::new(mta_response())));

        let outcome = p.run(batch()).await.unwrap();
        assert_eq!(outcome.decision.kind, TransactionKind::MidTermAdjustment);
        assert_eq!(outcome.decision.reference.as_deref(), Some("POL100"));
        assert_eq!(outcome.documents.len(), 2);

        let [a, b] = &outcome.documents[..] else {
            panic!("expected two documents")
        };
        assert_ne!(a.doc_id, b.doc_id);
        assert_ne!(a.content_hash, b.content_hash);
        assert_ne!(a.blob_url, b.blob_url);
        assert_eq!(a.extracted_json, b.extracted_json);
        assert_eq!(a.transaction_type.as_deref(), Some("MTA"));
        assert_eq!(a.status, "Completed");

        let finals = sink.finals.lock().await;
        assert_eq!(finals.len(), 2);
    }

    #[tokio::test]
    async fn extraction_failure_marks_every_row_error() {
        let sink = Arc::new(RecordingSink::new());
        let p = pipeline(sink.clone(), Arc::new(FailingExtractor));

        let err = p.run(batch()).await.unwrap_err();
        assert!(matches!(err, IngestError::Extraction(_)));

        let finals = sink.finals.lock().await;
        assert_eq!(finals.len(), 2);
        assert!(finals.iter().all(|d| d.status == "Error"));
        assert!(finals
            .iter()
            .all(|d| d.error_detail.as_deref().unwrap().contains("connection refused")));
    }

    #[tokio::test]
    async fn filename_sniff_rescues_a_dead_extractor() {
        let sink = Arc::new(RecordingSink::new());
        let p = pipeline(sink.clone(), Arc::new(FailingExtractor))
            .with_fallback(ExtractionFallback::FilenameSniff);

        let files = vec![FilePayload {
            file_name: "motor_claim_form.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: b"scan".to_vec(),
        }];
        let outcome = p.run(files).await.unwrap();
        assert_eq!(outcome.decision.kind, TransactionKind::NewClaim);
        assert!(outcome.decision.prefill.is_empty());
        assert_eq!(outcome.documents[0].status, "Completed");
    }

    #[tokio::test]
    async fn insert_failures_do_not_abort_the_batch() {
        let sink = Arc::new(RecordingSink::failing());
        let p = pipeline(sink.clone(), Arc::new(StaticExtractor::new(mta_response())));

        let outcome = p.run(batch()).await.unwrap();
        assert_eq!(outcome.documents.len(), 2);
        // Inserts all failed, finalize still ran for every row.
        assert!(sink.records.lock().await.is_empty());
        assert_eq!(sink.finals.lock().await.len(), 2);
    }
}
