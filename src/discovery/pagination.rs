//! Rendered category pages, followed through their "next page" links
//!
//! A traversal stops at the first of: no next link, a next link already
//! fetched, a listing page that contributes no member not already seen in this
//! traversal, or the page ceiling.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use url::Url;

use super::config::{WikiSite, strip_category_prefix};
use super::{Discoverer, DiscoverySet, item_link};
use crate::fetch::Fetcher;
use crate::page::{Link, Page};
use crate::record::Strategy;

fn listing(html: &str) -> (Vec<Link>, Option<String>) {
    let page = Page::parse(html);
    (page.category_member_links(), page.next_page_href())
}

fn resolve(site: &WikiSite, href: &str) -> Option<String> {
    Url::parse(&site.base_url)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .ok()
}

impl<F: Fetcher> Discoverer<F> {
    /// Follow one category's rendered listing from its first page
    pub(crate) async fn paginate(&self, site: &WikiSite, root: &str, set: &mut DiscoverySet) {
        let root = strip_category_prefix(root);
        let mut next = Some(site.category_url(&root));
        let mut fetched: HashSet<String> = HashSet::new();
        let mut members: HashSet<String> = HashSet::new();
        let before = set.len();

        while let Some(url) = next.take() {
            if fetched.len() as u32 >= self.config.max_pages {
                warn!("Category:{} hit the {} page ceiling", root, self.config.max_pages);
                break;
            }
            fetched.insert(url.clone());

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Skipping listing {}: {}", url, e);
                    set.failed_categories += 1;
                    break;
                }
            };

            let (links, next_href) = listing(&html);
            let mut new_members = 0;
            for link in &links {
                let Some(page_ref) = item_link(site, link, 1, Strategy::Pagination) else {
                    continue;
                };
                if members.insert(page_ref.key()) {
                    new_members += 1;
                    set.insert(page_ref.with_origin(&root));
                }
            }
            debug!("{} listed {} new members", url, new_members);

            if new_members == 0 {
                break;
            }

            next = next_href
                .and_then(|href| resolve(site, &href))
                .filter(|u| !fetched.contains(u));

            if next.is_some() {
                self.pause().await;
            }
        }

        info!(
            "Pagination of Category:{} on {} fetched {} pages, added {} pages",
            root,
            site.host(),
            fetched.len(),
            set.len() - before
        );
    }

    pub(crate) async fn follow_pagination(&self, site: &WikiSite, set: &mut DiscoverySet) {
        for root in &self.config.pagination_roots {
            self.paginate(site, root, set).await;
            self.pause().await;
        }
    }
}
