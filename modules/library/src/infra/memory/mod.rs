//! In-process adapters: a realtime document store, a blob store, an identity
//! provider and device files. Used by tests and local wiring.

mod auth;
mod blobs;
mod documents;
mod files;

pub use auth::MemoryAuth;
pub use blobs::MemoryBlobs;
pub use documents::MemoryDocuments;
pub use files::MemoryFiles;
