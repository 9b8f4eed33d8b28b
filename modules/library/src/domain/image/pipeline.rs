use std::sync::Arc;

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use super::acquire::{uri_extension, AcquireStrategy};
use crate::config::LibraryConfig;
use crate::contract::model::{LocalImage, UserId};
use crate::domain::error::DomainError;
use crate::domain::layout::StorageLayout;
use crate::domain::ports::{BlobStore, ImagePayload};

/// Naming and size limits of uploaded images.
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    pub max_bytes: usize,
    pub object_prefix: String,
    pub default_extension: String,
    pub token_length: usize,
}

impl ImagePolicy {
    pub fn new(cfg: &LibraryConfig) -> Self {
        Self {
            max_bytes: cfg.max_image_bytes,
            object_prefix: cfg.object_prefix.clone(),
            default_extension: cfg.default_extension.clone(),
            token_length: cfg.token_length,
        }
    }

    /// Reject empty payloads and payloads above the limit (the limit itself is allowed).
    pub fn validate(&self, payload: &ImagePayload) -> Result<(), DomainError> {
        if payload.is_empty() {
            return Err(DomainError::EmptyPayload);
        }
        if payload.len() > self.max_bytes {
            return Err(DomainError::payload_too_large(payload.len(), self.max_bytes));
        }
        Ok(())
    }

    /// `{prefix}_{unix millis}_{random token}.{extension of the source}`
    pub fn object_name(&self, uri: &str) -> String {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.token_length)
            .map(char::from)
            .collect();
        let extension = uri_extension(uri).unwrap_or(&self.default_extension);
        format!(
            "{}_{}_{}.{}",
            self.object_prefix,
            Utc::now().timestamp_millis(),
            token,
            extension
        )
    }
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self::new(&LibraryConfig::default())
    }
}

/// Local image → validated payload → blob → retrieval URL.
///
/// Acquisition strategies run in order and the first success wins. Failures
/// other than validation are logged and reported as `ImageUploadFailed`.
#[derive(Clone)]
pub struct ImagePipeline {
    strategies: Vec<Arc<dyn AcquireStrategy>>,
    blobs: Arc<dyn BlobStore>,
    layout: StorageLayout,
    policy: ImagePolicy,
}

impl ImagePipeline {
    pub fn new(
        strategies: Vec<Arc<dyn AcquireStrategy>>,
        blobs: Arc<dyn BlobStore>,
        layout: StorageLayout,
        policy: ImagePolicy,
    ) -> Self {
        Self {
            strategies,
            blobs,
            layout,
            policy,
        }
    }

    #[instrument(
        name = "library.image.upload",
        skip_all,
        fields(owner = %owner, uri = %image.uri)
    )]
    pub async fn upload(&self, owner: &UserId, image: &LocalImage) -> Result<String, DomainError> {
        let payload = self.acquire(&image.uri).await?;
        self.policy.validate(&payload)?;

        let name = image
            .file_name
            .clone()
            .unwrap_or_else(|| self.policy.object_name(&image.uri));
        let path = self.layout.image_object(owner, &name);
        let size = payload.len();

        self.blobs.put(&path, payload).await.map_err(|e| {
            warn!(%path, "image upload failed: {e:#}");
            DomainError::ImageUploadFailed
        })?;

        let url = self.blobs.download_url(&path).await.map_err(|e| {
            warn!(%path, "resolving download URL failed: {e:#}");
            DomainError::ImageUploadFailed
        })?;

        info!(%path, size, "image uploaded");
        Ok(url.to_string())
    }

    async fn acquire(&self, uri: &str) -> Result<ImagePayload, DomainError> {
        for strategy in &self.strategies {
            match strategy.acquire(uri).await {
                Ok(payload) => {
                    debug!(strategy = strategy.name(), size = payload.len(), "image acquired");
                    return Ok(payload);
                }
                Err(e) => {
                    debug!(strategy = strategy.name(), "image acquisition failed: {e:#}");
                }
            }
        }
        warn!("no acquisition strategy could read the image");
        Err(DomainError::ImageUploadFailed)
    }
}
