//! Category-membership recursion through the MediaWiki API
//!
//! Each category listing is drained through its continuation tokens before
//! the next category is touched. Subcategories are queued breadth-first up to
//! the configured depth; a visited set keyed by site and normalized name stops
//! cycles.

use std::collections::VecDeque;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::config::{WikiSite, strip_category_prefix};
use super::{Discoverer, DiscoverySet};
use crate::fetch::{FetchError, Fetcher};
use crate::record::{PageRef, Strategy, normalize_title};

/// Main (article) namespace
const NS_MAIN: i64 = 0;

/// Category namespace
const NS_CATEGORY: i64 = 14;

#[derive(Debug, Deserialize)]
struct MembersResponse {
    #[serde(default)]
    query: Option<MembersQuery>,

    #[serde(default, rename = "continue")]
    continuation: Option<Continuation>,
}

#[derive(Debug, Deserialize)]
struct MembersQuery {
    #[serde(default)]
    categorymembers: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    ns: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct Continuation {
    cmcontinue: Option<String>,
}

/// Members of one fully drained category listing
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CategoryListing {
    pub pages: Vec<String>,
    pub subcategories: Vec<String>,
}

/// API URL listing the members of `category`, optionally from a continuation token
pub(crate) fn members_url(
    site: &WikiSite,
    category: &str,
    continuation: Option<&str>,
) -> Result<String, FetchError> {
    let cmtitle = format!("Category:{}", strip_category_prefix(category));
    let mut params = vec![
        ("action", "query"),
        ("list", "categorymembers"),
        ("cmtitle", cmtitle.as_str()),
        ("cmlimit", "500"),
        ("format", "json"),
    ];
    if let Some(token) = continuation {
        params.push(("cmcontinue", token));
    }
    Ok(Url::parse_with_params(&site.api_url(), &params)?.to_string())
}

/// Identity of a category within a site
pub(crate) fn category_key(site: &WikiSite, category: &str) -> String {
    format!(
        "{}:{}",
        site.host(),
        normalize_title(&strip_category_prefix(category))
    )
}

impl<F: Fetcher> Discoverer<F> {
    /// Fetch every member of one category, following continuation tokens up
    /// to the configured cap
    pub(crate) async fn list_category(
        &self,
        site: &WikiSite,
        category: &str,
    ) -> Result<CategoryListing, FetchError> {
        let mut listing = CategoryListing::default();
        let mut continuation: Option<String> = None;
        let mut requests = 0u32;

        loop {
            let url = members_url(site, category, continuation.as_deref())?;
            let body = self.fetcher.fetch(&url).await?;
            requests += 1;

            let response: MembersResponse =
                serde_json::from_str(&body).map_err(|e| FetchError::Malformed {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            for member in response.query.map(|q| q.categorymembers).unwrap_or_default() {
                match member.ns {
                    NS_MAIN => listing.pages.push(member.title),
                    NS_CATEGORY => listing
                        .subcategories
                        .push(strip_category_prefix(&member.title)),
                    _ => {}
                }
            }

            let next = response.continuation.and_then(|c| c.cmcontinue);
            match next {
                Some(token) if continuation.as_deref() == Some(token.as_str()) => {
                    warn!("Category:{} repeated continuation token {}", category, token);
                    break;
                }
                Some(_) if requests >= self.config.max_continuations.max(1) => {
                    warn!(
                        "Category:{} still continuing after {} requests, stopping",
                        category, requests
                    );
                    break;
                }
                Some(token) => {
                    continuation = Some(token);
                    self.pause().await;
                }
                None => break,
            }
        }

        Ok(listing)
    }

    /// Walk the category tree of one site from the seeds
    #[instrument(skip(self, seeds, set), fields(site = %site.base_url))]
    pub(crate) async fn crawl_categories(
        &self,
        site: &WikiSite,
        seeds: &[String],
        set: &mut DiscoverySet,
    ) {
        let mut queue: VecDeque<(String, u32, String)> = seeds
            .iter()
            .map(|s| (strip_category_prefix(s), 0, strip_category_prefix(s)))
            .collect();
        let before = set.len();

        while let Some((category, depth, seed)) = queue.pop_front() {
            if !set.visited_categories.insert(category_key(site, &category)) {
                continue;
            }

            let listing = match self.list_category(site, &category).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!("Skipping Category:{}: {}", category, e);
                    set.failed_categories += 1;
                    self.pause().await;
                    continue;
                }
            };

            debug!(
                "{}Category:{} - {} items, {} subcats",
                "  ".repeat(depth as usize),
                category,
                listing.pages.len(),
                listing.subcategories.len()
            );

            for title in listing.pages {
                let page_ref = PageRef::new(&title, site.page_url(&title), Strategy::CategoryApi)
                    .with_origin(&seed);
                set.insert(page_ref);
            }

            if depth < self.config.max_depth {
                for sub in listing.subcategories {
                    if !set.visited_categories.contains(&category_key(site, &sub)) {
                        queue.push_back((sub, depth + 1, seed.clone()));
                    }
                }
            }

            self.pause().await;
        }

        info!(
            "Category API on {} added {} pages",
            site.host(),
            set.len() - before
        );
    }
}
