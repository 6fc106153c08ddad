//! Error types for the icarus-recipes crate

use thiserror::Error;

use crate::fetch::FetchError;
use crate::store::StoreError;

/// Result type for scraper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for scraper operations
#[derive(Debug, Error)]
pub enum Error {
    /// A page or API listing could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Reading or writing the persisted database failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A worker task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(format!("Failed to join task: {}", err))
    }
}

impl From<tokio::sync::AcquireError> for Error {
    fn from(err: tokio::sync::AcquireError) -> Self {
        Self::Task(format!("Failed to acquire worker permit: {}", err))
    }
}
