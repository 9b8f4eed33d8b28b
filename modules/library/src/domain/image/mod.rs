pub mod acquire;
pub mod base64;
pub mod mime;
pub mod pipeline;

pub use acquire::{default_strategies, AcquireStrategy, Base64ReadAcquire, FetchAcquire};
pub use pipeline::{ImagePipeline, ImagePolicy};
