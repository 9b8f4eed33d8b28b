pub mod auth;
pub mod blobs;
pub mod documents;
pub mod files;

pub use auth::AuthPort;
pub use blobs::{BlobStore, ImagePayload};
pub use documents::{
    CollectionPath, CollectionQuery, Document, DocumentBackend, DocumentWrite, FieldValue,
    Snapshot, SnapshotStream, StoredValue,
};
pub use files::{FetchedResource, LocalFiles};
