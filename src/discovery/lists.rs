//! Curated list-page scraping

use tracing::{info, warn};

use super::config::WikiSite;
use super::{Discoverer, DiscoverySet, item_link};
use crate::fetch::Fetcher;
use crate::page::{Link, Page};
use crate::record::Strategy;

fn content_links(html: &str) -> Vec<Link> {
    Page::parse(html).content_links()
}

impl<F: Fetcher> Discoverer<F> {
    /// Collect item links from every configured list page on one site
    pub(crate) async fn scrape_list_pages(&self, site: &WikiSite, set: &mut DiscoverySet) {
        let before = set.len();

        for title in &self.config.list_pages {
            let url = site.page_url(title);
            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Skipping list page {}: {}", url, e);
                    set.failed_pages += 1;
                    self.pause().await;
                    continue;
                }
            };

            let mut found = 0;
            for link in content_links(&html) {
                if let Some(page_ref) = item_link(site, &link, self.config.min_link_text, Strategy::ListPage) {
                    if set.insert(page_ref.with_origin(title)) {
                        found += 1;
                    }
                }
            }
            info!("List page {} added {} pages", title, found);

            self.pause().await;
        }

        info!(
            "List pages on {} added {} pages",
            site.host(),
            set.len() - before
        );
    }
}
