use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use url::Url;

use crate::domain::ports::{BlobStore, ImagePayload};

/// In-process blob store. Retrieval URLs follow the `/o/{encoded path}?alt=media`
/// shape of hosted object stores.
#[derive(Clone)]
pub struct MemoryBlobs {
    objects: Arc<RwLock<HashMap<String, ImagePayload>>>,
    base_url: String,
    failing_puts: Arc<Mutex<Option<String>>>,
}

impl Default for MemoryBlobs {
    fn default() -> Self {
        Self::new("memory://blobs")
    }
}

impl MemoryBlobs {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            failing_puts: Arc::new(Mutex::new(None)),
        }
    }

    /// Make the next `put` fail with `message`.
    pub fn fail_next_put(&self, message: impl Into<String>) {
        *self.failing_puts.lock() = Some(message.into());
    }

    pub fn get(&self, path: &str) -> Option<ImagePayload> {
        self.objects.read().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn put(&self, path: &str, payload: ImagePayload) -> anyhow::Result<()> {
        if let Some(message) = self.failing_puts.lock().take() {
            return Err(anyhow!(message));
        }
        self.objects.write().insert(path.to_string(), payload);
        Ok(())
    }

    async fn download_url(&self, path: &str) -> anyhow::Result<Url> {
        if !self.objects.read().contains_key(path) {
            return Err(anyhow!("object not found: {path}"));
        }
        let raw = format!(
            "{}/o/{}?alt=media",
            self.base_url,
            urlencoding::encode(path)
        );
        Url::parse(&raw).with_context(|| format!("building download URL {raw}"))
    }
}
