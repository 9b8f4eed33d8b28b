use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use base64::Engine as _;
use tracing::trace;
use url::Url;

use crate::domain::ports::{FetchedResource, LocalFiles};

/// Device files backed by the host: `http(s)` URIs are fetched over the
/// network, `file://` URIs and plain paths are read from disk.
#[derive(Clone, Default)]
pub struct FsLocalFiles {
    client: reqwest::Client,
}

impl FsLocalFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Filesystem path of `uri`, or `None` for non-file schemes.
fn local_path(uri: &str) -> anyhow::Result<Option<PathBuf>> {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map(Some)
            .map_err(|_| anyhow!("not a local file URI: {uri}")),
        // single-letter schemes are Windows drive letters
        Ok(url) if url.scheme().len() > 1 => Ok(None),
        _ => Ok(Some(PathBuf::from(uri))),
    }
}

#[async_trait]
impl LocalFiles for FsLocalFiles {
    async fn fetch(&self, uri: &str) -> anyhow::Result<FetchedResource> {
        let url = match Url::parse(uri) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => bail!("fetch is not supported for {uri}"),
        };
        trace!(%url, "fetching image");
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        Ok(FetchedResource {
            status,
            content_type,
            bytes,
        })
    }

    async fn read_base64(&self, uri: &str) -> anyhow::Result<String> {
        let path = local_path(uri)?.ok_or_else(|| anyhow!("cannot read {uri} from disk"))?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_path_of_supported_forms() {
        assert_eq!(
            local_path("/tmp/a.png").unwrap(),
            Some(PathBuf::from("/tmp/a.png"))
        );
        assert!(local_path("https://x.io/a.png").unwrap().is_none());
        assert!(local_path("content://media/1").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn file_uri_maps_to_path() {
        assert_eq!(
            local_path("file:///tmp/a%20b.png").unwrap(),
            Some(PathBuf::from("/tmp/a b.png"))
        );
    }
}
