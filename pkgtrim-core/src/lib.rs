pub mod classify;
pub mod config;
pub mod console;
pub mod dependency;
pub mod error;
pub mod index;
pub mod manifest;
pub mod operations;
pub mod pipelines;
pub mod resolve;

pub use classify::{RedundancyFinding, RedundancyReason};
pub use config::TrimConfig;
pub use error::TrimError;
pub use manifest::ManifestDocument;
pub use pipelines::{PipelineCatalog, PipelineResolver};
pub use resolve::DependencyResolver;

pub type Result<T> = std::result::Result<T, TrimError>;
