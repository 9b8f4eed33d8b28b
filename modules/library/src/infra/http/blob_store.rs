use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, field, Instrument, Level};
use url::Url;

use crate::config::StorageConfig;
use crate::domain::ports::{BlobStore, ImagePayload};

/// Object metadata as returned by the storage REST API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Blob store speaking the hosted object-storage REST protocol:
/// `POST {upload}/o?uploadType=media&name=..` to write, `GET {upload}/o/{path}`
/// for metadata, and `{download}/o/{path}?alt=media&token=..` to read.
#[derive(Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    upload_base: String,
    download_base: String,
}

impl HttpBlobStore {
    pub fn new(cfg: &StorageConfig) -> Self {
        Self::with_client(reqwest::Client::new(), cfg)
    }

    pub fn with_client(client: reqwest::Client, cfg: &StorageConfig) -> Self {
        Self {
            client,
            upload_base: cfg.upload_base_url.trim_end_matches('/').to_string(),
            download_base: cfg.download_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send `req` inside an `outgoing_http` span and fail on non-2xx.
    async fn execute(&self, req: reqwest::Request) -> anyhow::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = %req.method(),
            http.url = %req.url(),
            http.status_code = field::Empty,
        );
        async {
            let response = self.client.execute(req).await?;
            let status = response.status();
            tracing::Span::current().record("http.status_code", status.as_u16());
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                bail!("storage request failed with {status}: {body}");
            }
            Ok(response)
        }
        .instrument(span)
        .await
    }

    async fn metadata(&self, path: &str) -> anyhow::Result<ObjectMetadata> {
        let url = format!("{}/o/{}", self.upload_base, urlencoding::encode(path));
        let req = self.client.get(&url).build()?;
        self.execute(req)
            .await?
            .json::<ObjectMetadata>()
            .await
            .with_context(|| format!("decoding metadata of {path}"))
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, path: &str, payload: ImagePayload) -> anyhow::Result<()> {
        let url = format!("{}/o", self.upload_base);
        let req = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header(reqwest::header::CONTENT_TYPE, payload.content_type.clone())
            .body(payload.bytes)
            .build()?;
        let meta: ObjectMetadata = self
            .execute(req)
            .await?
            .json()
            .await
            .with_context(|| format!("decoding upload response for {path}"))?;
        debug!(name = %meta.name, "object stored");
        Ok(())
    }

    async fn download_url(&self, path: &str) -> anyhow::Result<Url> {
        let meta = self.metadata(path).await?;
        let raw = format!(
            "{}/o/{}?alt=media",
            self.download_base,
            urlencoding::encode(&meta.name)
        );
        let mut url = Url::parse(&raw).with_context(|| format!("building download URL {raw}"))?;
        // several tokens may be listed; any of them grants access
        if let Some(token) = meta
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').map(str::trim).find(|t| !t.is_empty()))
        {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }
}
