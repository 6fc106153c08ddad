//! # Discovery Configuration Module
//!
//! Which wikis to walk, where to start, and the bounds that keep every
//! traversal finite: recursion depth for category trees, a page ceiling for
//! paginated listings and a cap on continuation requests per category.

use std::time::Duration;

/// A MediaWiki site to discover pages on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiSite {
    /// Scheme and host without a trailing slash, e.g. `https://icarus.fandom.com`
    pub base_url: String,

    /// Path of the MediaWiki API endpoint, e.g. `/api.php`
    pub api_path: String,
}

impl WikiSite {
    pub fn new(base_url: impl Into<String>, api_path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_path: api_path.into(),
        }
    }

    /// The Fandom community wiki
    pub fn fandom() -> Self {
        Self::new("https://icarus.fandom.com", "/api.php")
    }

    /// The wiki.gg community wiki
    pub fn wiki_gg() -> Self {
        Self::new("https://icarus.wiki.gg", "/api.php")
    }

    pub fn api_url(&self) -> String {
        format!("{}{}", self.base_url, self.api_path)
    }

    /// Article URL for a page title
    pub fn page_url(&self, title: &str) -> String {
        let slug = title.trim().replace(' ', "_");
        format!("{}/wiki/{}", self.base_url, urlencoding::encode(&slug))
    }

    /// Rendered category page URL
    pub fn category_url(&self, category: &str) -> String {
        format!(
            "{}/wiki/Category:{}",
            self.base_url,
            strip_category_prefix(category).replace(' ', "_")
        )
    }

    /// Host part, used to scope visited-category keys per site
    pub fn host(&self) -> &str {
        self.base_url
            .split("://")
            .nth(1)
            .unwrap_or(&self.base_url)
    }
}

/// Category name without a `Category:` prefix, underscores as spaces
pub fn strip_category_prefix(name: &str) -> String {
    let name = name.trim();
    let bare = name
        .get(..9)
        .filter(|prefix| prefix.eq_ignore_ascii_case("category:"))
        .map(|_| &name[9..])
        .unwrap_or(name);
    bare.replace('_', " ").trim().to_string()
}

/// Seed categories walked through the API
pub const DEFAULT_SEED_CATEGORIES: &[&str] = &[
    "Items",
    "Equippable Items",
    "Building Pieces",
    "Tools",
    "Weapons",
    "Armor",
    "Consumables",
    "Medicine",
    "Deployables",
    "Furniture",
    "Materials",
    "Resources",
    "Food",
    "Ammunition",
    "Water Sources",
    "Electricity Sources",
    "Light Sources",
    "Storage",
    "Farming",
];

/// Curated index pages whose in-content links are mostly items
pub const DEFAULT_LIST_PAGES: &[&str] = &[
    "Water Sources",
    "Building",
    "Cooking",
    "Crafting",
    "Mining",
    "Items Index",
    "Deployables",
    "Tools",
    "Weapons",
];

/// Categories whose rendered pages are paginated through
pub const DEFAULT_PAGINATION_ROOTS: &[&str] = &[
    "Building Pieces",
    "Tools",
    "Weapons",
    "Deployables",
    "Armor",
    "Consumables",
    "Materials",
    "Resources",
];

/// Configuration for page discovery
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Wikis to discover on, in priority order
    pub sites: Vec<WikiSite>,

    /// Categories the API recursion starts from
    pub seed_categories: Vec<String>,

    /// Titles of curated list pages
    pub list_pages: Vec<String>,

    /// Categories whose HTML listing is followed page by page
    pub pagination_roots: Vec<String>,

    /// Maximum subcategory recursion depth; seeds are depth 0
    pub max_depth: u32,

    /// Maximum listing pages fetched per paginated traversal
    pub max_pages: u32,

    /// Maximum API continuation requests per category
    pub max_continuations: u32,

    /// Pause between sequential requests in milliseconds
    pub delay_ms: u64,

    /// Minimum visible text length for a list-page link to count as an item
    pub min_link_text: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            sites: vec![WikiSite::fandom(), WikiSite::wiki_gg()],
            seed_categories: DEFAULT_SEED_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            list_pages: DEFAULT_LIST_PAGES.iter().map(|s| s.to_string()).collect(),
            pagination_roots: DEFAULT_PAGINATION_ROOTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_depth: 4,
            max_pages: 50,
            max_continuations: 50,
            delay_ms: 300,
            min_link_text: 3,
        }
    }
}

impl DiscoveryConfig {
    /// Create a new builder
    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::new()
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Builder for DiscoveryConfig
#[derive(Debug, Default)]
pub struct DiscoveryConfigBuilder {
    config: DiscoveryConfig,
}

impl DiscoveryConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DiscoveryConfig::default(),
        }
    }

    /// Replace the list of wikis
    pub fn sites(mut self, sites: Vec<WikiSite>) -> Self {
        self.config.sites = sites;
        self
    }

    pub fn seed_categories<I, S>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.seed_categories = seeds.into_iter().map(Into::into).collect();
        self
    }

    pub fn list_pages<I, S>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.list_pages = pages.into_iter().map(Into::into).collect();
        self
    }

    pub fn pagination_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.pagination_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Set the maximum subcategory depth
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the page ceiling for paginated listings
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    pub fn max_continuations(mut self, max_continuations: u32) -> Self {
        self.config.max_continuations = max_continuations;
        self
    }

    /// Set the politeness delay in milliseconds
    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.delay_ms = delay_ms;
        self
    }

    pub fn min_link_text(mut self, min_link_text: usize) -> Self {
        self.config.min_link_text = min_link_text;
        self
    }

    /// Build the configuration
    pub fn build(self) -> DiscoveryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.max_pages, 50);
        assert_eq!(config.delay(), Duration::from_millis(300));
        assert!(config.seed_categories.contains(&"Building Pieces".to_string()));
    }

    #[test]
    fn test_builder() {
        let config = DiscoveryConfig::builder()
            .sites(vec![WikiSite::new("https://wiki.test/", "/w/api.php")])
            .seed_categories(["Tools"])
            .list_pages(Vec::<String>::new())
            .max_depth(1)
            .delay_ms(0)
            .build();
        assert_eq!(config.sites[0].api_url(), "https://wiki.test/w/api.php");
        assert_eq!(config.seed_categories, vec!["Tools"]);
        assert!(config.list_pages.is_empty());
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.max_pages, 50);
    }

    #[test]
    fn test_site_urls() {
        let site = WikiSite::fandom();
        assert_eq!(site.host(), "icarus.fandom.com");
        assert_eq!(
            site.page_url("Fish & Chips"),
            "https://icarus.fandom.com/wiki/Fish_%26_Chips"
        );
        assert_eq!(
            site.category_url("Category:Building Pieces"),
            "https://icarus.fandom.com/wiki/Category:Building_Pieces"
        );
    }

    #[test]
    fn test_strip_category_prefix() {
        assert_eq!(strip_category_prefix("Category:Water_Sources"), "Water Sources");
        assert_eq!(strip_category_prefix("category:Tools"), "Tools");
        assert_eq!(strip_category_prefix("Armor"), "Armor");
    }
}
