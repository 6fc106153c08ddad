//! Item-page discovery
//!
//! No single listing on the wikis reaches every item, so [`Discoverer`] runs
//! three independent strategies per site and unions their results:
//!
//! 1. category-membership recursion through the MediaWiki API
//! 2. links scraped from curated list pages
//! 3. rendered category pages followed through their "next page" links
//!
//! Pages are deduplicated by normalized title and keep the tag of the first
//! strategy that found them. Every loop is bounded by depth, a page ceiling
//! or a visited set, and a failed fetch only skips the node it was for.

pub(crate) mod api;
pub mod config;
mod lists;
mod pagination;

pub use config::{DiscoveryConfig, DiscoveryConfigBuilder, WikiSite};

use std::collections::{BTreeMap, BTreeSet, btree_map::Entry};

use tracing::{info, instrument};
use url::Url;

use crate::fetch::Fetcher;
use crate::page::Link;
use crate::record::{PageRef, Strategy, title_from_slug};

/// Namespaces whose pages are never items
pub const EXCLUDED_NAMESPACES: &[&str] = &[
    "category",
    "file",
    "image",
    "template",
    "special",
    "user",
    "user talk",
    "talk",
    "help",
    "module",
    "mediawiki",
    "forum",
    "message wall",
    "blog",
];

const EXCLUDED_TITLES: &[&str] = &["main page"];

/// Deduplicated discovery result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySet {
    pages: BTreeMap<String, PageRef>,

    /// Site-scoped keys of every category already listed
    pub visited_categories: BTreeSet<String>,

    /// Category listings that could not be fetched or parsed
    pub failed_categories: usize,

    /// List pages that could not be fetched
    pub failed_pages: usize,
}

impl DiscoverySet {
    /// Add a page unless one with the same normalized title is already known
    pub fn insert(&mut self, page_ref: PageRef) -> bool {
        let key = page_ref.key();
        if key.is_empty() {
            return false;
        }
        match self.pages.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(page_ref);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, title: &str) -> Option<&PageRef> {
        self.pages.get(&crate::record::normalize_title(title))
    }

    pub fn contains(&self, title: &str) -> bool {
        self.get(title).is_some()
    }

    /// Pages in normalized-title order
    pub fn page_refs(&self) -> impl Iterator<Item = &PageRef> {
        self.pages.values()
    }

    pub fn into_page_refs(self) -> Vec<PageRef> {
        self.pages.into_values().collect()
    }

    /// Pages credited to each strategy
    pub fn strategy_counts(&self) -> BTreeMap<Strategy, usize> {
        let mut counts = BTreeMap::new();
        for page in self.pages.values() {
            *counts.entry(page.strategy).or_insert(0) += 1;
        }
        counts
    }
}

/// Turn an in-content link into an item page reference, if it looks like one:
/// same site, article path, no query or fragment, not in an excluded
/// namespace, and visible text of at least `min_text` characters
pub(crate) fn item_link(
    site: &WikiSite,
    link: &Link,
    min_text: usize,
    strategy: Strategy,
) -> Option<PageRef> {
    let href = link.href.trim();
    if href.contains('?') || href.contains('#') {
        return None;
    }

    let path = if href.starts_with("/wiki/") {
        href.to_string()
    } else {
        let base = Url::parse(&site.base_url).ok()?;
        let absolute = Url::parse(href).ok()?;
        if absolute.origin() != base.origin() {
            return None;
        }
        absolute.path().to_string()
    };

    let slug = path.strip_prefix("/wiki/")?;
    if slug.is_empty() {
        return None;
    }

    let title = title_from_slug(slug);
    if let Some((namespace, _)) = title.split_once(':') {
        let namespace = namespace.trim().to_lowercase();
        if EXCLUDED_NAMESPACES.contains(&namespace.as_str()) {
            return None;
        }
    }
    if EXCLUDED_TITLES.contains(&title.to_lowercase().as_str()) {
        return None;
    }

    let text = link.text.trim();
    if text.chars().count() < min_text {
        return None;
    }
    let lower = text.to_lowercase();
    if ["category", "file", "template"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return None;
    }

    Some(PageRef::new(
        title,
        format!("{}{}", site.base_url, path),
        strategy,
    ))
}

/// Runs the discovery strategies against the configured wikis
#[derive(Debug, Clone)]
pub struct Discoverer<F> {
    fetcher: F,
    config: DiscoveryConfig,
}

impl<F: Fetcher> Discoverer<F> {
    pub fn new(fetcher: F, config: DiscoveryConfig) -> Self {
        Self { fetcher, config }
    }

    /// Politeness delay between sequential requests
    async fn pause(&self) {
        let delay = self.config.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Union of all strategies over all sites, starting the category
    /// recursion from `seeds`
    #[instrument(skip_all, fields(seeds = seeds.len()))]
    pub async fn discover(&self, seeds: &[String]) -> DiscoverySet {
        let mut set = DiscoverySet::default();

        for site in &self.config.sites {
            self.crawl_categories(site, seeds, &mut set).await;
        }
        for site in &self.config.sites {
            self.scrape_list_pages(site, &mut set).await;
        }
        for site in &self.config.sites {
            self.follow_pagination(site, &mut set).await;
        }

        let counts = set.strategy_counts();
        info!(
            "Discovered {} unique pages (category API: {}, list pages: {}, pagination: {}), {} categories visited, {} failed",
            set.len(),
            counts.get(&Strategy::CategoryApi).copied().unwrap_or(0),
            counts.get(&Strategy::ListPage).copied().unwrap_or(0),
            counts.get(&Strategy::Pagination).copied().unwrap_or(0),
            set.visited_categories.len(),
            set.failed_categories + set.failed_pages
        );
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use serde_json::json;

    fn site() -> WikiSite {
        WikiSite::new("https://wiki.test", "/api.php")
    }

    fn config() -> DiscoveryConfig {
        DiscoveryConfig::builder()
            .sites(vec![site()])
            .seed_categories(Vec::<String>::new())
            .list_pages(Vec::<String>::new())
            .pagination_roots(Vec::<String>::new())
            .delay_ms(0)
            .build()
    }

    fn api(category: &str, continuation: Option<&str>) -> String {
        api::members_url(&site(), category, continuation).unwrap()
    }

    fn members(pages: &[&str], subcategories: &[&str], continuation: Option<&str>) -> String {
        let mut list: Vec<serde_json::Value> = pages
            .iter()
            .map(|t| json!({"pageid": 1, "ns": 0, "title": t}))
            .collect();
        list.extend(
            subcategories
                .iter()
                .map(|t| json!({"pageid": 2, "ns": 14, "title": format!("Category:{}", t)})),
        );
        list.push(json!({"pageid": 3, "ns": 2, "title": "User:Someone"}));

        let mut body = json!({"batchcomplete": "", "query": {"categorymembers": list}});
        if let Some(token) = continuation {
            body["continue"] = json!({"cmcontinue": token, "continue": "-||"});
        }
        body.to_string()
    }

    fn seeds(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn listing_page(members: &[&str], next: Option<&str>) -> String {
        let links: String = members
            .iter()
            .map(|m| {
                format!(
                    r#"<div class="category-page__member"><a class="category-page__member-link" href="/wiki/{}">{}</a></div>"#,
                    m.replace(' ', "_"),
                    m
                )
            })
            .collect();
        let next = next
            .map(|href| {
                format!(r#"<a class="category-page__pagination-next" href="{}">Next page</a>"#, href)
            })
            .unwrap_or_default();
        format!("<html><body>{}{}</body></html>", links, next)
    }

    #[tokio::test]
    async fn test_cyclic_category_graph_terminates() {
        let fetcher = StaticFetcher::new()
            .with_page(api("A", None), members(&["Alpha"], &["B"], None))
            .with_page(api("B", None), members(&["Beta"], &["A"], None));
        let discoverer = Discoverer::new(fetcher, config());

        let set = discoverer.discover(&seeds(&["A"])).await;

        assert_eq!(set.len(), 2);
        assert!(set.contains("Alpha"));
        assert!(set.contains("beta"));
        assert_eq!(set.visited_categories.len(), 2);
        assert_eq!(set.failed_categories, 0);
        assert_eq!(discoverer.fetcher.hits(&api("A", None)), 1);
        assert_eq!(discoverer.fetcher.hits(&api("B", None)), 1);

        let beta = set.get("Beta").unwrap();
        assert_eq!(beta.strategy, Strategy::CategoryApi);
        assert_eq!(beta.url, "https://wiki.test/wiki/Beta");
        assert_eq!(beta.origin.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_self_referencing_category() {
        let fetcher = StaticFetcher::new()
            .with_page(api("A", None), members(&["Alpha"], &["A", "A"], None));
        let discoverer = Discoverer::new(fetcher, config());

        let set = discoverer.discover(&seeds(&["Category:A", "A"])).await;
        assert_eq!(set.len(), 1);
        assert_eq!(discoverer.fetcher.total_requests(), 1);
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let fetcher = StaticFetcher::new()
            .with_page(api("A", None), members(&["Alpha"], &["B"], None))
            .with_page(api("B", None), members(&["Beta"], &["C"], None))
            .with_page(api("C", None), members(&["Gamma"], &[], None));
        let mut config = config();
        config.max_depth = 1;
        let discoverer = Discoverer::new(fetcher, config);

        let set = discoverer.discover(&seeds(&["A"])).await;
        assert_eq!(set.len(), 2);
        assert!(!set.contains("Gamma"));
        assert_eq!(discoverer.fetcher.hits(&api("C", None)), 0);
    }

    #[tokio::test]
    async fn test_continuation_is_drained() {
        let fetcher = StaticFetcher::new()
            .with_page(api("A", None), members(&["Alpha"], &[], Some("page|B")))
            .with_page(api("A", Some("page|B")), members(&["Beta"], &[], Some("page|C")))
            .with_page(api("A", Some("page|C")), members(&["Gamma"], &[], None));
        let discoverer = Discoverer::new(fetcher, config());

        let set = discoverer.discover(&seeds(&["A"])).await;
        assert_eq!(set.len(), 3);
        assert!(set.contains("Gamma"));
    }

    #[tokio::test]
    async fn test_continuation_cap() {
        let fetcher = StaticFetcher::new()
            .with_page(api("A", None), members(&["Alpha"], &[], Some("1")))
            .with_page(api("A", Some("1")), members(&["Beta"], &[], Some("2")))
            .with_page(api("A", Some("2")), members(&["Gamma"], &[], None));
        let config = DiscoveryConfig {
            max_continuations: 2,
            ..config()
        };
        let discoverer = Discoverer::new(fetcher, config);

        let set = discoverer.discover(&seeds(&["A"])).await;
        assert_eq!(set.len(), 2);
        assert_eq!(discoverer.fetcher.hits(&api("A", Some("2"))), 0);
    }

    #[tokio::test]
    async fn test_repeated_continuation_token_stops() {
        let fetcher = StaticFetcher::new()
            .with_page(api("A", None), members(&["Alpha"], &[], Some("loop")))
            .with_page(api("A", Some("loop")), members(&["Beta"], &[], Some("loop")));
        let discoverer = Discoverer::new(fetcher, config());

        let set = discoverer.discover(&seeds(&["A"])).await;
        assert_eq!(set.len(), 2);
        assert_eq!(discoverer.fetcher.hits(&api("A", Some("loop"))), 1);
    }

    #[tokio::test]
    async fn test_failed_category_is_skipped() {
        let fetcher = StaticFetcher::new()
            .with_page(api("Broken", None), "<html>not json</html>")
            .with_page(api("A", None), members(&["Alpha"], &[], None));
        let discoverer = Discoverer::new(fetcher, config());

        let set = discoverer.discover(&seeds(&["Missing", "Broken", "A"])).await;
        assert_eq!(set.len(), 1);
        assert_eq!(set.failed_categories, 2);
    }

    #[tokio::test]
    async fn test_list_page_link_filter() {
        let html = r#"<html><body>
            <nav><a href="/wiki/Sidebar_Item">Sidebar Item</a></nav>
            <div class="mw-parser-output">
              <ul>
                <li><a href="/wiki/Wood_Spear" title="Wood Spear">Wood Spear</a></li>
                <li><a href="https://wiki.test/wiki/Stone_Axe">Stone Axe</a></li>
                <li><a href="/wiki/Category:Tools">Tools</a></li>
                <li><a href="/wiki/File:Axe.png">Axe icon</a></li>
                <li><a href="/wiki/Template:Nav">Navigation</a></li>
                <li><a href="/wiki/Stone?action=edit">Edit Stone</a></li>
                <li><a href="/wiki/Bow#Recipe">Bow recipe</a></li>
                <li><a href="https://other.test/wiki/Axe">Other Axe</a></li>
                <li><a href="/wiki/Ax">Ax</a></li>
                <li><a href="/wiki/Main_Page">Home page</a></li>
              </ul>
            </div></body></html>"#;
        let fetcher = StaticFetcher::new().with_page(site().page_url("Items Index"), html);
        let config = DiscoveryConfig {
            list_pages: seeds(&["Items Index"]),
            ..config()
        };
        let discoverer = Discoverer::new(fetcher, config);

        let set = discoverer.discover(&[]).await;
        let titles: Vec<&str> = set.page_refs().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Stone Axe", "Wood Spear"]);
        assert!(set.page_refs().all(|p| p.strategy == Strategy::ListPage));
        assert_eq!(
            set.get("Stone Axe").unwrap().url,
            "https://wiki.test/wiki/Stone_Axe"
        );
    }

    #[tokio::test]
    async fn test_missing_list_page_is_counted() {
        let config = DiscoveryConfig {
            list_pages: seeds(&["Nowhere"]),
            ..config()
        };
        let discoverer = Discoverer::new(StaticFetcher::new(), config);
        let set = discoverer.discover(&[]).await;
        assert!(set.is_empty());
        assert_eq!(set.failed_pages, 1);
    }

    #[tokio::test]
    async fn test_pagination_stops_on_revisited_page() {
        let first = site().category_url("Things");
        let fetcher = StaticFetcher::new()
            .with_page(
                &first,
                listing_page(&["Wood", "Stone"], Some("/wiki/Category:Things?from=T")),
            )
            .with_page(
                "https://wiki.test/wiki/Category:Things?from=T",
                listing_page(&["Tin Ore"], Some("/wiki/Category:Things")),
            );
        let config = DiscoveryConfig {
            pagination_roots: seeds(&["Things"]),
            ..config()
        };
        let discoverer = Discoverer::new(fetcher, config);

        let set = discoverer.discover(&[]).await;
        assert_eq!(set.len(), 3);
        assert!(set.contains("Tin Ore"));
        assert_eq!(discoverer.fetcher.hits(&first), 1);
        assert_eq!(set.strategy_counts()[&Strategy::Pagination], 3);
    }

    #[tokio::test]
    async fn test_pagination_page_ceiling() {
        let url = |i: usize| {
            if i == 0 {
                site().category_url("Endless")
            } else {
                format!("https://wiki.test/wiki/Category:Endless?from={}", i)
            }
        };
        let mut fetcher = StaticFetcher::new();
        for i in 0..5 {
            let next = format!("/wiki/Category:Endless?from={}", i + 1);
            fetcher = fetcher.with_page(
                url(i),
                listing_page(&[format!("Item {}", i).as_str()], Some(next.as_str())),
            );
        }
        let config = DiscoveryConfig {
            pagination_roots: seeds(&["Endless"]),
            max_pages: 3,
            ..config()
        };
        let discoverer = Discoverer::new(fetcher, config);

        let set = discoverer.discover(&[]).await;
        assert_eq!(set.len(), 3);
        assert_eq!(discoverer.fetcher.total_requests(), 3);
        assert_eq!(discoverer.fetcher.hits(&url(3)), 0);
    }

    #[tokio::test]
    async fn test_strategies_union_first_wins() {
        let list_html = r#"<div class="mw-parser-output">
            <a href="/wiki/Wood">Wood</a> <a href="/wiki/Bow">Bow</a></div>"#;
        let fetcher = StaticFetcher::new()
            .with_page(api("Resources", None), members(&["Wood"], &[], None))
            .with_page(site().page_url("Crafting"), list_html)
            .with_page(
                site().category_url("Weapons"),
                listing_page(&["Bow", "Spear"], None),
            );
        let config = DiscoveryConfig {
            list_pages: seeds(&["Crafting"]),
            pagination_roots: seeds(&["Weapons"]),
            ..config()
        };
        let discoverer = Discoverer::new(fetcher, config);

        let set = discoverer.discover(&seeds(&["Resources"])).await;
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("Wood").unwrap().strategy, Strategy::CategoryApi);
        assert_eq!(set.get("Bow").unwrap().strategy, Strategy::ListPage);
        assert_eq!(set.get("Spear").unwrap().strategy, Strategy::Pagination);
    }

    #[tokio::test]
    async fn test_discovery_is_idempotent() {
        let fetcher = StaticFetcher::new()
            .with_page(api("A", None), members(&["Alpha", "Gamma"], &["B"], None))
            .with_page(api("B", None), members(&["Beta"], &["A"], None));
        let discoverer = Discoverer::new(fetcher, config());

        let first = discoverer.discover(&seeds(&["A"])).await;
        let second = discoverer.discover(&seeds(&["A"])).await;
        assert_eq!(first, second);
    }
}
