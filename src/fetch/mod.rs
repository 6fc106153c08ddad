//! Page fetching
//!
//! Every network access in the crate goes through the [`Fetcher`] trait: the
//! discovery strategies and the extractor only ever ask for "the HTML (or JSON)
//! behind this URL". [`HttpFetcher`] is the production implementation; tests use
//! an in-memory map.

mod config;
mod error;

pub use config::{BROWSER_USER_AGENT, FetcherConfig, FetcherConfigBuilder};
pub use error::FetchError;

use std::future::Future;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, RateLimiter, Quota};
use reqwest::Client as ReqwestClient;
use tracing::{debug, debug_span, instrument, warn, Instrument};

/// Capability to turn a URL into a response body
pub trait Fetcher: Send + Sync {
    /// Fetch the body behind `url`. A failure is terminal for that URL within a run.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

impl<F: Fetcher> Fetcher for Arc<F> {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
        (**self).fetch(url)
    }
}

/// reqwest-backed fetcher with a fixed timeout and a shared request-rate limiter
#[derive(Clone)]
pub struct HttpFetcher {
    client: ReqwestClient,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl HttpFetcher {
    /// Create a new fetcher from configuration
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(config.rate()))),
        })
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.limiter
            .until_ready()
            .instrument(debug_span!("limiter"))
            .await;

        debug!("Sending GET request to {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
