use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use ulid::Ulid;

use crate::limits::MAX_UPLOAD_BYTES;

/// A file handed to an upload store (room photos, guest documents).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Where a stored blob can be fetched from, and the id to delete it by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredBlob {
    pub url: String,
    pub id: String,
}

#[derive(Debug)]
pub enum UploadError {
    Empty,
    TooLarge { size: usize, max: usize },
    Backend(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::Empty => write!(f, "upload is empty"),
            UploadError::TooLarge { size, max } => {
                write!(f, "upload of {size} bytes exceeds the {max} byte limit")
            }
            UploadError::Backend(e) => write!(f, "upload backend error: {e}"),
        }
    }
}

impl std::error::Error for UploadError {}

/// Capability for storing uploaded files with some provider.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, blob: Blob) -> Result<StoredBlob, UploadError>;

    /// Returns whether a blob with `id` existed.
    async fn delete(&self, id: &str) -> Result<bool, UploadError>;
}

fn check_size(blob: &Blob) -> Result<(), UploadError> {
    if blob.bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if blob.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size: blob.bytes.len(),
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Keeps blobs in memory and hands out URLs under `base_url`.
pub struct MemoryBlobStore {
    base_url: String,
    blobs: DashMap<String, Blob>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blobs: DashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<Blob> {
        self.blobs.get(id).map(|b| b.value().clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, blob: Blob) -> Result<StoredBlob, UploadError> {
        check_size(&blob)?;
        let id = Ulid::new().to_string();
        let url = format!("{}/{id}/{}", self.base_url, blob.filename);
        tracing::debug!("stored upload {id} ({} bytes)", blob.bytes.len());
        self.blobs.insert(id.clone(), blob);
        Ok(StoredBlob { url, id })
    }

    async fn delete(&self, id: &str) -> Result<bool, UploadError> {
        Ok(self.blobs.remove(id).is_some())
    }
}
