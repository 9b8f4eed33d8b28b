use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tracing::debug;

use super::base64;
use super::mime::content_type_for;
use crate::domain::ports::{ImagePayload, LocalFiles};

/// Extension of the last path segment of `uri`, ignoring query and fragment.
pub fn uri_extension(uri: &str) -> Option<&str> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// One way of turning a local image reference into bytes.
#[async_trait]
pub trait AcquireStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn acquire(&self, uri: &str) -> anyhow::Result<ImagePayload>;
}

/// Read the resource like a network fetch; non-2xx is a failure.
pub struct FetchAcquire {
    files: Arc<dyn LocalFiles>,
}

impl FetchAcquire {
    pub fn new(files: Arc<dyn LocalFiles>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl AcquireStrategy for FetchAcquire {
    fn name(&self) -> &'static str {
        "fetch"
    }

    async fn acquire(&self, uri: &str) -> anyhow::Result<ImagePayload> {
        let resource = self.files.fetch(uri).await?;
        if !resource.is_success() {
            bail!("Failed to fetch file: {}", resource.status);
        }
        let content_type = resource
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| content_type_for(uri_extension(uri).unwrap_or("")).to_string());
        Ok(ImagePayload::new(resource.bytes, content_type))
    }
}

/// Read the file as base64 text and decode it; the content type comes from
/// the extension table.
pub struct Base64ReadAcquire {
    files: Arc<dyn LocalFiles>,
}

impl Base64ReadAcquire {
    pub fn new(files: Arc<dyn LocalFiles>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl AcquireStrategy for Base64ReadAcquire {
    fn name(&self) -> &'static str {
        "base64-read"
    }

    async fn acquire(&self, uri: &str) -> anyhow::Result<ImagePayload> {
        debug!("Using file read to load image");
        let encoded = self.files.read_base64(uri).await?;
        let bytes = base64::decode(&encoded).context("decoding base64 file contents")?;
        let content_type = content_type_for(uri_extension(uri).unwrap_or(""));
        Ok(ImagePayload::new(bytes, content_type))
    }
}

/// Fetch first, then the base64 file read.
pub fn default_strategies(files: Arc<dyn LocalFiles>) -> Vec<Arc<dyn AcquireStrategy>> {
    vec![
        Arc::new(FetchAcquire::new(Arc::clone(&files))),
        Arc::new(Base64ReadAcquire::new(files)),
    ]
}
