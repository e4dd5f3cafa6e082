//! Environment-driven configuration.

use std::path::PathBuf;

use ib_ingest::ExtractionFallback;

/// Everything the server reads from the environment, resolved once at
/// startup. Secrets (OpenAI key, extraction auth code) stay with the
/// clients that use them.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub database_url: String,
    pub port: u16,
    /// Root directory for the local blob store.
    pub blob_root: PathBuf,
    /// What happens to a batch when the extraction service is down.
    pub extraction_fallback: ExtractionFallback,
    /// Hard cap on rows returned by the warehouse agent.
    pub agent_max_rows: i64,
}

impl PortalConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost:5432/ib-portal".to_string());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let blob_root = std::env::var("BLOB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let extraction_fallback = match std::env::var("EXTRACTION_FALLBACK").as_deref() {
            Ok("sniff") | Ok("filename") => ExtractionFallback::FilenameSniff,
            _ => ExtractionFallback::Abort,
        };

        let agent_max_rows = std::env::var("AGENT_MAX_ROWS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(200);

        Self {
            database_url,
            port,
            blob_root,
            extraction_fallback,
            agent_max_rows,
        }
    }
}
