use async_trait::async_trait;

/// Result of reading a local resource the way a network fetch would.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedResource {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Device file access. Platforms differ in which of the two reads works for a
/// given URI, so callers try both.
#[async_trait]
pub trait LocalFiles: Send + Sync {
    async fn fetch(&self, uri: &str) -> anyhow::Result<FetchedResource>;
    async fn read_base64(&self, uri: &str) -> anyhow::Result<String>;
}
