//! # icarus-recipes CLI
//!
//! Command-line front end for the scraping pipeline.
//!
//! - `scrape`: full discovery followed by extraction of every page found
//! - `update`: re-extract only persisted records with unresolved fields
//! - `discover`: run discovery alone and print or save the page list
//! - `bundle`: rebuild the combined bundle from the category files
//!
//! Logs go to stderr (filtered by `RUST_LOG`), optionally to a rolling file,
//! and to an OTLP collector when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

mod telemetry;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use icarus_recipes::categorize::Category;
use icarus_recipes::discovery::{DiscoveryConfig, WikiSite};
use icarus_recipes::fetch::{FetcherConfig, HttpFetcher};
use icarus_recipes::pipeline::{Pipeline, PipelineConfig, ProgressEvent, RunMode, RunStats};
use icarus_recipes::store::Store;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::instrument;

#[derive(Parser)]
#[command(author, version, about = "Builds a categorized Icarus crafting-recipe database from the community wikis", long_about = None)]
struct Cli {
    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover every item page and extract all of them
    Scrape(RunArgs),

    /// Re-extract only records that still have unknown fields
    Update(RunArgs),

    /// Discover item pages without extracting them
    Discover(DiscoverArgs),

    /// Rebuild the combined bundle from the category files
    Bundle(BundleArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Site {
    Fandom,
    WikiGg,
}

impl Site {
    fn wiki(self) -> WikiSite {
        match self {
            Site::Fandom => WikiSite::fandom(),
            Site::WikiGg => WikiSite::wiki_gg(),
        }
    }
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Per-request timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Maximum requests per second across all workers
    #[arg(long, default_value = "5")]
    rate: u32,
}

#[derive(Args, Debug)]
struct DiscoveryArgs {
    /// Wikis to crawl
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Site::Fandom, Site::WikiGg])]
    sites: Vec<Site>,

    /// Maximum subcategory recursion depth
    #[arg(short, long, default_value = "4")]
    depth: u32,

    /// Maximum pages per paginated category listing
    #[arg(short = 'p', long, default_value = "50")]
    max_pages: u32,

    /// Delay between sequential discovery requests in milliseconds
    #[arg(long, default_value = "300")]
    delay: u64,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Number of pages extracted concurrently
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Directory holding the category files
    #[arg(short, long, default_value = "data")]
    output_dir: PathBuf,

    /// Extract at most this many pages
    #[arg(short, long)]
    limit: Option<usize>,

    /// Bucket for items no rule matches
    #[arg(long, default_value = "raw_materials")]
    default_category: Category,

    #[command(flatten)]
    fetch: FetchArgs,

    #[command(flatten)]
    discovery: DiscoveryArgs,
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    /// Save the page list as JSON instead of printing titles
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    fetch: FetchArgs,

    #[command(flatten)]
    discovery: DiscoveryArgs,
}

#[derive(Args, Debug)]
struct BundleArgs {
    /// Directory holding the category files
    #[arg(short, long, default_value = "data")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init_tracing_subscriber(cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Scrape(args) => run_command(RunMode::Full, args).await?,
        Commands::Update(args) => run_command(RunMode::Update, args).await?,
        Commands::Discover(args) => discover_command(args).await?,
        Commands::Bundle(args) => bundle_command(args).await?,
    }

    Ok(())
}

fn fetcher(args: &FetchArgs) -> anyhow::Result<HttpFetcher> {
    let config = FetcherConfig::builder()
        .timeout_secs(args.timeout)
        .requests_per_second(args.rate)
        .build();
    Ok(HttpFetcher::new(&config)?)
}

fn discovery_config(args: &DiscoveryArgs) -> DiscoveryConfig {
    DiscoveryConfig::builder()
        .sites(args.sites.iter().map(|site| site.wiki()).collect())
        .max_depth(args.depth)
        .max_pages(args.max_pages)
        .delay_ms(args.delay)
        .build()
}

#[instrument]
async fn run_command(mode: RunMode, args: RunArgs) -> anyhow::Result<()> {
    let config = PipelineConfig::builder()
        .workers(args.workers)
        .output_dir(&args.output_dir)
        .mode(mode)
        .default_category(args.default_category)
        .limit(args.limit)
        .build();

    let (progress_sender, mut progress_receiver) = mpsc::channel(100);
    let pipeline = Pipeline::new(
        fetcher(&args.fetch)?,
        discovery_config(&args.discovery),
        config,
    )
    .with_progress(progress_sender);

    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    progress_bar.set_message(match mode {
        RunMode::Full => "Discovering pages...",
        RunMode::Update => "Loading persisted records...",
    });

    let start_time = Instant::now();

    // Ends once the pipeline and all its workers have dropped their senders
    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(event) = progress_receiver.recv().await {
                match event {
                    ProgressEvent::Started { total } => {
                        progress_bar.set_length(total as u64);
                        progress_bar.set_message("Extracting pages...");
                    }
                    ProgressEvent::PageDone { title, ok } => {
                        progress_bar.inc(1);
                        if ok {
                            progress_bar.set_message(format!("Extracted {}", title));
                        } else {
                            progress_bar.set_message(format!("Failed {}", title));
                        }
                    }
                }
            }
            progress_bar.finish_with_message("Extraction completed");
        }
    });

    let result = pipeline.run().await;
    drop(pipeline);
    let _ = progress_handle.await;
    let stats = result?;

    print_stats(&stats, &args.output_dir, start_time.elapsed());
    Ok(())
}

fn print_stats(stats: &RunStats, output_dir: &std::path::Path, elapsed: std::time::Duration) {
    println!(
        "Scraped {} of {} pages in {:.2?} ({} failed)",
        stats.pages_scraped, stats.pages_targeted, elapsed, stats.failed_pages
    );
    println!(
        "{} new records, {} updated, {} total in {}",
        stats.new_records,
        stats.updated_records,
        stats.total_records,
        output_dir.display()
    );
    for (category, count) in stats.categories.iter().filter(|(_, count)| **count > 0) {
        println!("  {:<22} {}", category, count);
    }
}

#[instrument]
async fn discover_command(args: DiscoverArgs) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(
        fetcher(&args.fetch)?,
        discovery_config(&args.discovery),
        PipelineConfig::default(),
    );

    let set = pipeline.discover().await;

    match args.output {
        Some(path) => {
            let pages: Vec<_> = set.page_refs().collect();
            tokio::fs::write(&path, serde_json::to_string_pretty(&pages)?).await?;
            println!("Saved {} pages to {}", pages.len(), path.display());
        }
        None => {
            for page in set.page_refs() {
                println!("{}\t{}\t{}", page.title, page.strategy, page.url);
            }
        }
    }

    println!(
        "Found {} pages, visited {} categories, {} failed categories, {} failed list pages",
        set.len(),
        set.visited_categories.len(),
        set.failed_categories,
        set.failed_pages
    );
    Ok(())
}

#[instrument]
async fn bundle_command(args: BundleArgs) -> anyhow::Result<()> {
    let store = Store::new(&args.output_dir);
    let (path, count) = store.rebuild_bundle().await?;
    println!("Bundled {} items into {}", count, path.display());
    Ok(())
}
