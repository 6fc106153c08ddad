//! # Fetcher Configuration Module
//!
//! Controls how pages are requested from the wikis: per-request timeout, the
//! client signature sent with every request, and the global request rate that
//! keeps the worker pool polite towards the source sites.

use std::num::NonZeroU32;
use std::time::Duration;

/// Browser-like client signature; the wikis serve reduced markup to unknown agents
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Timeout for a single request in seconds
    pub timeout_secs: u64,

    /// User agent to use for requests
    pub user_agent: String,

    /// Upper bound on requests per second across all workers
    pub requests_per_second: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: BROWSER_USER_AGENT.to_string(),
            requests_per_second: 10,
        }
    }
}

/// Builder for FetcherConfig
#[derive(Debug, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    /// Set the per-request timeout in seconds
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the global request rate
    pub fn requests_per_second(mut self, requests_per_second: u32) -> Self {
        self.config.requests_per_second = requests_per_second;
        self
    }

    /// Build the configuration
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

impl FetcherConfig {
    /// Create a new builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }

    /// Get the timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Request rate as a governor-compatible value; zero is clamped to one
    pub fn rate(&self) -> NonZeroU32 {
        NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN)
    }
}
