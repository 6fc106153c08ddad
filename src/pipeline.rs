//! End-to-end scraping run
//!
//! A [`Pipeline`] discovers item pages (or, in update mode, picks persisted
//! records that still have unresolved fields), extracts them on a bounded pool
//! of worker tasks, categorizes and merges the results into the persisted
//! database, then writes the category files, the bundle and a run summary.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::future;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::categorize::{Categorizer, Category};
use crate::discovery::{Discoverer, DiscoveryConfig, DiscoverySet};
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::record::{ItemRecord, PageRef, Strategy};
use crate::store::{DiscoverySummary, RecordMap, Store, Summary, merge};

/// Which pages a run extracts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Discover every page, then extract all of them
    #[default]
    Full,
    /// Re-extract only persisted records with unresolved fields
    Update,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Full => f.write_str("full"),
            RunMode::Update => f.write_str("update"),
        }
    }
}

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of pages extracted concurrently
    pub workers: usize,

    /// Directory holding the category files
    pub output_dir: PathBuf,

    pub mode: RunMode,

    /// Bucket for items no rule matches
    pub default_category: Category,

    /// Extract at most this many pages
    pub limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            output_dir: PathBuf::from("data"),
            mode: RunMode::Full,
            default_category: Category::RawMaterials,
            limit: None,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for [`PipelineConfig`]
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn default_category(mut self, category: Category) -> Self {
        self.config.default_category = category;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.config.limit = limit;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

/// Progress notifications sent while extracting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Extraction is about to start on `total` pages
    Started { total: usize },
    /// One page finished, successfully or not
    PageDone { title: String, ok: bool },
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// Pages handed to the extractor
    pub pages_targeted: usize,
    pub pages_scraped: usize,
    pub failed_pages: usize,
    /// Records not present before this run
    pub new_records: usize,
    /// Existing records changed by a merge
    pub updated_records: usize,
    pub total_records: usize,
    pub categories: BTreeMap<String, usize>,
}

/// Shared result collection behind the worker pool's lock
#[derive(Debug, Default)]
struct RunState {
    records: RecordMap,
    stats: RunStats,
}

impl RunState {
    /// Fold a fresh record into the collection. `previous` is the key the
    /// record was persisted under, which differs from the fresh key when the
    /// page title changed.
    fn absorb(&mut self, fresh: ItemRecord, previous: Option<&str>) {
        let key = fresh.key();
        let renamed = previous
            .filter(|k| *k != key)
            .and_then(|k| self.records.remove(k));
        let current = self.records.remove(&key);

        // A rename onto a title that already has a record folds both
        // persisted records together before the fresh one lands.
        let (existing, collided) = match (current, renamed) {
            (Some(current), Some(renamed)) => (Some(merge(&current, &renamed)), true),
            (current, renamed) => (current.or(renamed), false),
        };

        match existing {
            Some(existing) => {
                let merged = merge(&existing, &fresh);
                if collided || merged != existing {
                    self.stats.updated_records += 1;
                }
                self.records.insert(merged.key(), merged);
            }
            None => {
                self.stats.new_records += 1;
                self.records.insert(key, fresh);
            }
        }
    }
}

/// One extraction target; `previous` is the persisted key in update mode
#[derive(Debug, Clone)]
struct Target {
    page_ref: PageRef,
    previous: Option<String>,
}

/// Discovery, extraction, categorization and persistence for one run
pub struct Pipeline<F> {
    fetcher: F,
    discovery: DiscoveryConfig,
    config: PipelineConfig,
    store: Store,
    categorizer: Categorizer,
    progress: Option<mpsc::Sender<ProgressEvent>>,
}

impl<F: Fetcher + Clone + 'static> Pipeline<F> {
    pub fn new(fetcher: F, discovery: DiscoveryConfig, config: PipelineConfig) -> Self {
        let store = Store::new(&config.output_dir);
        let categorizer = Categorizer::new(config.default_category);
        Self {
            fetcher,
            discovery,
            config,
            store,
            categorizer,
            progress: None,
        }
    }

    /// Send [`ProgressEvent`]s to `sender` while extracting
    pub fn with_progress(mut self, sender: mpsc::Sender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run discovery alone from the configured seed categories
    pub async fn discover(&self) -> DiscoverySet {
        let discoverer = Discoverer::new(self.fetcher.clone(), self.discovery.clone());
        discoverer.discover(&self.discovery.seed_categories).await
    }

    /// Execute a complete run and persist its output
    #[instrument(skip(self), fields(mode = %self.config.mode, workers = self.config.workers))]
    pub async fn run(&self) -> Result<RunStats> {
        if self.config.workers == 0 {
            return Err(Error::Config("worker count must be at least 1".to_string()));
        }

        let existing = self.store.load_all().await?;
        info!("Loaded {} persisted records", existing.len());

        let (mut targets, discovery) = match self.config.mode {
            RunMode::Full => {
                let set = self.discover().await;
                let summary = discovery_summary(&set);
                let targets = set
                    .into_page_refs()
                    .into_iter()
                    .map(|page_ref| Target {
                        page_ref,
                        previous: None,
                    })
                    .collect::<Vec<_>>();
                (targets, summary)
            }
            RunMode::Update => (update_targets(&existing), DiscoverySummary::default()),
        };

        if let Some(limit) = self.config.limit {
            targets.truncate(limit);
        }
        info!("Extracting {} pages", targets.len());

        let state = Arc::new(Mutex::new(RunState {
            records: existing,
            stats: RunStats {
                pages_targeted: targets.len(),
                ..RunStats::default()
            },
        }));

        self.extract_all(targets, Arc::clone(&state)).await?;

        let mut state = state.lock().await;
        let counts = self.store.write_categories(&state.records).await?;
        self.store.write_bundle(&state.records).await?;

        state.stats.total_records = state.records.len();
        state.stats.categories = counts
            .into_iter()
            .map(|(category, count)| (category.slug().to_string(), count))
            .collect();

        let summary = Summary {
            generated_at: Utc::now(),
            mode: self.config.mode.to_string(),
            total_items: state.stats.total_records,
            categories: state.stats.categories.clone(),
            discovery,
            pages_scraped: state.stats.pages_scraped,
            failed_pages: state.stats.failed_pages,
        };
        self.store.write_summary(&summary).await?;

        info!(
            "Run complete: {} scraped, {} failed, {} new, {} updated, {} total",
            state.stats.pages_scraped,
            state.stats.failed_pages,
            state.stats.new_records,
            state.stats.updated_records,
            state.stats.total_records
        );
        Ok(state.stats.clone())
    }

    /// Extract every target on the worker pool, folding results into `state`
    async fn extract_all(&self, targets: Vec<Target>, state: Arc<Mutex<RunState>>) -> Result<()> {
        if let Some(sender) = &self.progress {
            let _ = sender
                .send(ProgressEvent::Started {
                    total: targets.len(),
                })
                .await;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let extractor = Arc::new(Extractor::new(self.fetcher.clone()));
        let mut handles = Vec::with_capacity(targets.len());

        for target in targets {
            let permit = Arc::clone(&semaphore).acquire_owned();
            let extractor = Arc::clone(&extractor);
            let state = Arc::clone(&state);
            let categorizer = self.categorizer;
            let progress = self.progress.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit.await?;
                let Target { page_ref, previous } = target;

                let ok = match extractor.try_extract(&page_ref).await {
                    Ok(mut record) => {
                        record.category = categorizer.categorize_record(&record);
                        debug!("{} -> {} ({})", page_ref.title, record.name, record.category);

                        let mut state = state.lock().await;
                        state.absorb(record, previous.as_deref());
                        state.stats.pages_scraped += 1;
                        true
                    }
                    Err(e) => {
                        warn!("Failed to extract {}: {}", page_ref.url, e);
                        state.lock().await.stats.failed_pages += 1;
                        false
                    }
                };

                if let Some(sender) = progress {
                    let _ = sender
                        .send(ProgressEvent::PageDone {
                            title: page_ref.title,
                            ok,
                        })
                        .await;
                }

                Ok::<(), Error>(())
            });
            handles.push(handle);
        }

        for result in future::join_all(handles).await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Extraction task failed: {}", e),
                Err(e) => error!("Extraction task panicked: {}", e),
            }
        }
        Ok(())
    }
}

/// Persisted records worth re-scraping, pointed at their source pages
fn update_targets(existing: &RecordMap) -> Vec<Target> {
    existing
        .iter()
        .filter(|(_, record)| record.has_unresolved_fields())
        .filter_map(|(key, record)| {
            if record.source_url.trim().is_empty() {
                warn!("{} has no source URL, cannot update", record.name);
                return None;
            }
            Some(Target {
                page_ref: PageRef::new(&record.name, &record.source_url, Strategy::Update),
                previous: Some(key.clone()),
            })
        })
        .collect()
}

fn discovery_summary(set: &DiscoverySet) -> DiscoverySummary {
    DiscoverySummary {
        pages_found: set.len(),
        categories_visited: set.visited_categories.len(),
        failed_categories: set.failed_categories,
        failed_list_pages: set.failed_pages,
        strategies: set
            .strategy_counts()
            .into_iter()
            .map(|(strategy, count)| (strategy.to_string(), count))
            .collect(),
    }
}
