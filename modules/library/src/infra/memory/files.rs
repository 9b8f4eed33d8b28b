use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use base64::Engine as _;
use parking_lot::RwLock;

use crate::domain::ports::{FetchedResource, LocalFiles};

#[derive(Clone)]
struct StoredFile {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

/// Device files kept in memory. Either read path can be switched off to mimic
/// platforms where only one of them works.
#[derive(Clone, Default)]
pub struct MemoryFiles {
    files: Arc<RwLock<HashMap<String, StoredFile>>>,
    fetch_status: Arc<RwLock<Option<u16>>>,
    read_disabled: Arc<RwLock<bool>>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.write().insert(
            uri.into(),
            StoredFile {
                bytes: bytes.into(),
                content_type: None,
            },
        );
    }

    /// Like `insert`, with the content type the fetch path reports.
    pub fn insert_typed(
        &self,
        uri: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) {
        self.files.write().insert(
            uri.into(),
            StoredFile {
                bytes: bytes.into(),
                content_type: Some(content_type.into()),
            },
        );
    }

    /// Answer every fetch with `status` and no body.
    pub fn fail_fetch_with(&self, status: u16) {
        *self.fetch_status.write() = Some(status);
    }

    pub fn disable_base64_read(&self) {
        *self.read_disabled.write() = true;
    }

    fn lookup(&self, uri: &str) -> Option<StoredFile> {
        self.files.read().get(uri).cloned()
    }
}

#[async_trait]
impl LocalFiles for MemoryFiles {
    async fn fetch(&self, uri: &str) -> anyhow::Result<FetchedResource> {
        if let Some(status) = *self.fetch_status.read() {
            return Ok(FetchedResource {
                status,
                content_type: None,
                bytes: Vec::new(),
            });
        }
        Ok(match self.lookup(uri) {
            Some(file) => FetchedResource {
                status: 200,
                content_type: file.content_type,
                bytes: file.bytes,
            },
            None => FetchedResource {
                status: 404,
                content_type: None,
                bytes: Vec::new(),
            },
        })
    }

    async fn read_base64(&self, uri: &str) -> anyhow::Result<String> {
        if *self.read_disabled.read() {
            return Err(anyhow!("file reads are not supported for {uri}"));
        }
        let file = self
            .lookup(uri)
            .ok_or_else(|| anyhow!("no such file: {uri}"))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(file.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_and_read_see_the_same_bytes() {
        let files = MemoryFiles::new();
        files.insert_typed("file:///a.png", vec![1u8, 2, 3], "image/png");

        let fetched = files.fetch("file:///a.png").await.unwrap();
        assert!(fetched.is_success());
        assert_eq!(fetched.bytes, vec![1, 2, 3]);
        assert_eq!(fetched.content_type.as_deref(), Some("image/png"));
        assert_eq!(files.read_base64("file:///a.png").await.unwrap(), "AQID");
    }

    #[tokio::test]
    async fn missing_and_disabled_paths() {
        let files = MemoryFiles::new();
        assert_eq!(files.fetch("file:///nope").await.unwrap().status, 404);
        assert!(files.read_base64("file:///nope").await.is_err());

        files.insert("file:///b.jpg", b"xyz".to_vec());
        files.fail_fetch_with(500);
        files.disable_base64_read();
        assert!(!files.fetch("file:///b.jpg").await.unwrap().is_success());
        assert!(files.read_base64("file:///b.jpg").await.is_err());
    }
}
