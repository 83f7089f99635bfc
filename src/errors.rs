//! Error types for fetching and merging index files

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to create fragment file {}: {source}", .path.display())]
    CreateFragment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed to read index archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to read fragment file {}: {source}", .path.display())]
    ReadFragment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write consolidated output {}: {source}", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),
}
