use async_trait::async_trait;
use url::Url;

/// Bytes plus the content type they are stored with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Object storage addressed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `payload` at `path`, replacing anything stored there.
    async fn put(&self, path: &str, payload: ImagePayload) -> anyhow::Result<()>;
    /// Stable retrieval URL of the object at `path`.
    async fn download_url(&self, path: &str) -> anyhow::Result<Url>;
}
