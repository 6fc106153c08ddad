use std::io;
use std::path::PathBuf;

/// Error type for reading and writing the category database
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Not found: {0}")]
    NotFound(String),
}
