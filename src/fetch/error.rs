//! Error types for the fetch module

use thiserror::Error;

/// Error type for page fetches
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure, including timeouts and connection resets
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{url} returned status {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// URL could not be built or parsed
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The response body did not have the expected shape
    #[error("Malformed response from {url}: {message}")]
    Malformed {
        /// Requested URL
        url: String,
        /// What was wrong with it
        message: String,
    },

    /// No page is known for the URL
    #[error("No page found at {0}")]
    NotFound(String),
}
