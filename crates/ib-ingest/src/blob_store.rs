//! Blob storage abstraction for uploaded document binaries.
//!
//! The portal only needs a thin surface: store under a key with some
//! descriptive metadata, fetch by the returned reference, delete. Local
//! filesystem backs the default deployment; the in-memory store backs
//! tests and ephemeral runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

/// Descriptive pairs stored alongside a blob: original file name, content
/// hash, whatever should be findable at the object itself.
pub type BlobMetadata = HashMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid blob reference: {0}")]
    InvalidRef(String),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store binary content with its metadata, return a reference URI.
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
        metadata: &BlobMetadata,
    ) -> Result<String, BlobStoreError>;

    /// Fetch binary content by reference.
    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError>;

    /// Delete binary content. Deleting a missing blob is not an error.
    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError>;

    /// Check whether a blob exists.
    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError>;
}

/// Local filesystem store rooted at a base directory. The filesystem has
/// no metadata channel, so metadata lands in a JSON sidecar next to the
/// content.
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_for_key(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn path_from_ref(&self, blob_ref: &str) -> Result<PathBuf, BlobStoreError> {
        blob_ref
            .strip_prefix("file://")
            .map(PathBuf::from)
            .ok_or_else(|| {
                BlobStoreError::InvalidRef(format!("expected file:// prefix: {blob_ref}"))
            })
    }

    fn sidecar_path(path: &std::path::Path) -> PathBuf {
        let mut meta = path.as_os_str().to_owned();
        meta.push(".meta.json");
        PathBuf::from(meta)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        _content_type: &str,
        metadata: &BlobMetadata,
    ) -> Result<String, BlobStoreError> {
        let path = self.path_for_key(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        if !metadata.is_empty() {
            let encoded = serde_json::to_vec_pretty(metadata)
                .map_err(|e| BlobStoreError::Storage(e.to_string()))?;
            tokio::fs::write(Self::sidecar_path(&path), encoded).await?;
        }

        Ok(format!("file://{}", path.display()))
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if !path.exists() {
            return Err(BlobStoreError::NotFound(blob_ref.to_string()));
        }
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        let sidecar = Self::sidecar_path(&path);
        if sidecar.exists() {
            tokio::fs::remove_file(sidecar).await?;
        }
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        Ok(path.exists())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: std::sync::Arc<tokio::sync::RwLock<HashMap<String, (Vec<u8>, BlobMetadata)>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata stored with a blob, if the blob exists.
    pub async fn metadata_for(&self, blob_ref: &str) -> Option<BlobMetadata> {
        let blobs = self.blobs.read().await;
        blobs.get(blob_ref).map(|(_, m)| m.clone())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        _content_type: &str,
        metadata: &BlobMetadata,
    ) -> Result<String, BlobStoreError> {
        let blob_ref = format!("memory://{key}");
        let mut blobs = self.blobs.write().await;
        blobs.insert(blob_ref.clone(), (content.to_vec(), metadata.clone()));
        Ok(blob_ref)
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        let blobs = self.blobs.read().await;
        blobs
            .get(blob_ref)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| BlobStoreError::NotFound(blob_ref.to_string()))
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(blob_ref);
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.contains_key(blob_ref))
    }
}
