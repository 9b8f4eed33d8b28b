use std::sync::Arc;

use tracing::{debug, info};

use crate::config::LibraryConfig;
use crate::contract::client::LibraryApi;
use crate::domain::image::{default_strategies, ImagePipeline, ImagePolicy};
use crate::domain::layout::StorageLayout;
use crate::domain::ports::{AuthPort, BlobStore, DocumentBackend, LocalFiles};
use crate::domain::service::{Service, ServiceConfig};
use crate::domain::store::{LibraryStore, SessionBinding};
use crate::gateways::local::LibraryLocalClient;
use crate::infra::fs::FsLocalFiles;
use crate::infra::http::HttpBlobStore;
use crate::infra::memory::{MemoryAuth, MemoryBlobs, MemoryDocuments, MemoryFiles};

/// Backend handles the library core runs against.
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthPort>,
    pub documents: Arc<dyn DocumentBackend>,
    pub blobs: Arc<dyn BlobStore>,
    pub files: Arc<dyn LocalFiles>,
}

impl Backends {
    /// Fully in-process backends.
    pub fn in_memory() -> Self {
        MemoryBackends::new().backends()
    }

    /// In-process identity and documents with host file access; blobs go to
    /// the HTTP store when `storage` is configured.
    pub fn local(cfg: &LibraryConfig) -> Self {
        let blobs: Arc<dyn BlobStore> = match &cfg.storage {
            Some(storage) => {
                debug!(upload = %storage.upload_base_url, "using HTTP blob store");
                Arc::new(HttpBlobStore::new(storage))
            }
            None => Arc::new(MemoryBlobs::default()),
        };
        Self {
            auth: Arc::new(MemoryAuth::new()),
            documents: Arc::new(MemoryDocuments::new()),
            blobs,
            files: Arc::new(FsLocalFiles::new()),
        }
    }
}

/// The in-memory fakes, kept concrete so tests can seed and inspect them.
#[derive(Clone, Default)]
pub struct MemoryBackends {
    pub auth: MemoryAuth,
    pub documents: MemoryDocuments,
    pub blobs: MemoryBlobs,
    pub files: MemoryFiles,
}

impl MemoryBackends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backends(&self) -> Backends {
        Backends {
            auth: Arc::new(self.auth.clone()),
            documents: Arc::new(self.documents.clone()),
            blobs: Arc::new(self.blobs.clone()),
            files: Arc::new(self.files.clone()),
        }
    }
}

/// Everything the screens need, built once and passed around explicitly.
///
/// While the context is alive the store follows the auth identity. Must be
/// created inside a Tokio runtime.
pub struct LibraryContext {
    config: LibraryConfig,
    store: LibraryStore,
    service: Arc<Service>,
    client: Arc<dyn LibraryApi>,
    _session: SessionBinding,
}

impl LibraryContext {
    pub fn new(config: LibraryConfig, backends: Backends) -> Self {
        let layout = StorageLayout::new(&config);
        let store = LibraryStore::new(
            Arc::clone(&backends.documents),
            Arc::clone(&backends.auth),
            layout.clone(),
        );
        let images = ImagePipeline::new(
            default_strategies(Arc::clone(&backends.files)),
            Arc::clone(&backends.blobs),
            layout,
            ImagePolicy::new(&config),
        );
        let service = Arc::new(Service::new(
            Arc::clone(&backends.auth),
            store.clone(),
            images,
            ServiceConfig::default(),
        ));
        let client: Arc<dyn LibraryApi> = Arc::new(LibraryLocalClient::new(Arc::clone(&service)));
        let session = store.follow_auth();

        info!(
            collection = %config.collection,
            order_by = %config.order_by,
            "library context ready"
        );
        Self {
            config,
            store,
            service,
            client,
            _session: session,
        }
    }

    /// Build from the `modules.library` section of the application config.
    pub fn from_app_config(app: &runtime::AppConfig, backends: Backends) -> anyhow::Result<Self> {
        let config = LibraryConfig::from_app_config(app)?;
        Ok(Self::new(config, backends))
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    pub fn client(&self) -> Arc<dyn LibraryApi> {
        Arc::clone(&self.client)
    }
}
