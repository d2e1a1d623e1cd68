use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrimError {
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Failed to fetch any repository index: {reason}")]
    Fetch { reason: String },

    #[error("HTTP request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Failed to unpack index archive from {url}: {source}")]
    Archive { url: String, source: std::io::Error },

    #[error("Invalid index from {url}: {reason}")]
    IndexFormat { url: String, reason: String },

    #[error("Failed to parse YAML in {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to read file {path:?}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to write file {path:?}: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },
}
