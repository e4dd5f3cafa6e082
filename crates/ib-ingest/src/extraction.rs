//! Client for the external document extraction service.
//!
//! The whole upload batch goes out as one multipart request and comes back
//! as one JSON body carrying a classification and a flat field map. OCR on
//! scanned schedules is slow, so the request runs under a deliberately
//! long fixed timeout rather than the portal's default.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::IngestError;

/// How long a batch may spend in extraction before the portal gives up.
const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(300);

/// One uploaded file, already buffered.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Document class assigned by the extraction service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
}

/// Extraction service response.
///
/// Newer deployments return `classification`; older ones return a bare
/// `Type` string. Both are kept and reconciled during routing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub classification: Option<Classification>,

    #[serde(default, rename = "Type")]
    pub legacy_type: Option<String>,

    #[serde(default)]
    pub extracted_fields: serde_json::Map<String, Value>,

    #[serde(default)]
    pub files_processed: Vec<String>,

    #[serde(default)]
    pub error: Option<String>,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Run one upload batch through extraction.
    async fn extract(&self, files: &[FilePayload]) -> Result<ExtractionResponse, IngestError>;
}

/// HTTP extractor talking to the deployed extraction endpoint.
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: String,
    auth_code: Option<String>,
}

impl HttpExtractor {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(EXTRACTION_TIMEOUT)
            .build()
            .map_err(|e| IngestError::Extraction(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            auth_code: None,
        })
    }

    pub fn with_auth_code(mut self, code: impl Into<String>) -> Self {
        self.auth_code = Some(code.into());
        self
    }

    /// Build from `EXTRACTION_API_URL` and, when set, `EXTRACTION_AUTH_CODE`.
    pub fn from_env() -> Result<Self, IngestError> {
        let endpoint = std::env::var("EXTRACTION_API_URL").map_err(|_| {
            IngestError::Extraction("EXTRACTION_API_URL environment variable not set".into())
        })?;
        let mut extractor = Self::new(endpoint)?;
        if let Ok(code) = std::env::var("EXTRACTION_AUTH_CODE") {
            extractor = extractor.with_auth_code(code);
        }
        Ok(extractor)
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, files: &[FilePayload]) -> Result<ExtractionResponse, IngestError> {
        if files.is_empty() {
            return Err(IngestError::EmptyBatch);
        }

        let mut form = reqwest::multipart::Form::new();
        if let Some(code) = &self.auth_code {
            form = form.text("auth_code", code.clone());
        }
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)
                .map_err(|e| IngestError::Extraction(e.to_string()))?;
            form = form.part("files", part);
        }

        tracing::info!(files = files.len(), endpoint = %self.endpoint, "sending batch to extraction");
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| IngestError::Extraction(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Extraction(format!(
                "extraction API error {status}: {body}"
            )));
        }

        let parsed: ExtractionResponse = response
            .json()
            .await
            .map_err(|e| IngestError::MalformedResponse(e.to_string()))?;

        if let Some(err) = &parsed.error {
            return Err(IngestError::Extraction(err.clone()));
        }
        Ok(parsed)
    }
}

/// Canned extractor for tests and offline runs.
pub struct StaticExtractor {
    response: ExtractionResponse,
}

impl StaticExtractor {
    pub fn new(response: ExtractionResponse) -> Self {
        Self { response }
    }
}

#[async_trait]
impl Extractor for StaticExtractor {
    async fn extract(&self, files: &[FilePayload]) -> Result<ExtractionResponse, IngestError> {
        if files.is_empty() {
            return Err(IngestError::EmptyBatch);
        }
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_response_shapes_deserialize() {
        let modern: ExtractionResponse = serde_json::from_str(
            r#"{
                "classification": {"category": "Policy", "subcategory": "MTA"},
                "extracted_fields": {"Policy Number": "POL100"},
                "files_processed": ["schedule.pdf", "endorsement.pdf"]
            }"#,
        )
        .unwrap();
        assert_eq!(
            modern.classification.as_ref().unwrap().category,
            "Policy"
        );
        assert_eq!(modern.files_processed.len(), 2);

        let legacy: ExtractionResponse = serde_json::from_str(
            r#"{"Type": "Claim Form", "extracted_fields": {"Claim Number": "CLM1"}}"#,
        )
        .unwrap();
        assert_eq!(legacy.legacy_type.as_deref(), Some("Claim Form"));
        assert!(legacy.classification.is_none());
    }

    #[tokio::test]
    async fn static_extractor_rejects_empty_batches() {
        let extractor = StaticExtractor::new(ExtractionResponse::default());
        let err = extractor.extract(&[]).await.unwrap_err();
        assert!(matches!(err, IngestError::EmptyBatch));
    }
}
