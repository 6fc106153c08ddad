//! # icarus-recipes
//!
//! Crawls the community wikis for the game Icarus and builds a categorized
//! crafting-recipe database.
//!
//! ## Pipeline
//!
//! - [`discovery`] enumerates item pages through category recursion, curated
//!   list pages and paginated category listings, deduplicated by title
//! - [`extract`] turns each page into an [`record::ItemRecord`] using layered,
//!   best-effort heuristics for recipe tables, stations, tiers and types
//! - [`categorize`] assigns every record to one of 21 output buckets
//! - [`store`] merges fresh records into the persisted ones without losing
//!   known or hand-curated values, and writes one JSON file per bucket
//! - [`pipeline`] runs the stages end to end on a bounded worker pool
//!
//! ## Example
//!
//! ```rust,no_run
//! use icarus_recipes::discovery::DiscoveryConfig;
//! use icarus_recipes::fetch::{FetcherConfig, HttpFetcher};
//! use icarus_recipes::pipeline::{Pipeline, PipelineConfig, RunMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = HttpFetcher::new(&FetcherConfig::default())?;
//!     let config = PipelineConfig::builder()
//!         .workers(4)
//!         .output_dir("data")
//!         .mode(RunMode::Update)
//!         .build();
//!
//!     let stats = Pipeline::new(fetcher, DiscoveryConfig::default(), config)
//!         .run()
//!         .await?;
//!     println!("{} records", stats.total_records);
//!     Ok(())
//! }
//! ```

mod error;

pub mod categorize;
pub mod discovery;
pub mod extract;
pub mod fetch;
pub mod page;
pub mod pipeline;
pub mod record;
pub mod store;

pub use error::{Error, Result};

/// Re-export of the most used types
pub mod prelude {
    pub use crate::categorize::{Categorizer, Category};
    pub use crate::discovery::{DiscoveryConfig, Discoverer, DiscoverySet, WikiSite};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::extract::Extractor;
    pub use crate::fetch::{Fetcher, FetcherConfig, HttpFetcher};
    pub use crate::pipeline::{Pipeline, PipelineConfig, RunMode, RunStats};
    pub use crate::record::{ItemRecord, ItemType, PageRef};
    pub use crate::store::{Store, merge, should_overwrite};
}
