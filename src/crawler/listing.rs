//! Paginated catalog listing crawler
//!
//! Walks the catalog index page by page and collects unique item URLs.
//! Pagination stops when a page no longer advertises a successor, when a
//! page cannot be fetched, or when the configured page ceiling is reached,
//! whichever comes first.

use crate::config::CatalogConfig;
use crate::crawler::PageFetcher;
use crate::{FetchError, SyncError};
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Item URLs newly discovered on one listing page
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// 1-based page number
    pub number: u32,
    /// URLs not seen on any earlier page, in page order
    pub new_urls: Vec<String>,
}

/// Result of draining a listing crawl
#[derive(Debug, Default)]
pub struct ListingOutcome {
    /// Unique item URLs in first-seen order
    pub urls: Vec<String>,
    /// Listing pages successfully fetched
    pub pages_fetched: u32,
    /// True when pagination was cut off by the page ceiling
    pub hit_page_ceiling: bool,
    /// The fetch failure that ended pagination early, if any
    pub failure: Option<FetchError>,
}

/// Lazy walker over the catalog listing
///
/// Each call to [`ListingCrawler::next_page`] fetches exactly one listing
/// page. The sequence is finite: it ends after `max_pages` pages at most.
pub struct ListingCrawler<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    base_url: Url,
    page_param: String,
    max_pages: u32,
    current_page: u32,
    finished: bool,
    hit_page_ceiling: bool,
    seen: HashSet<String>,
    item_href: Regex,
    next_rel: Regex,
}

impl<'a, F: PageFetcher + ?Sized> ListingCrawler<'a, F> {
    /// Creates a crawler positioned before page 1
    pub fn new(fetcher: &'a F, config: &CatalogConfig) -> Result<Self, SyncError> {
        let base_url = Url::parse(&config.base_url)?;

        let item_href = Regex::new(&format!(
            r#"href\s*=\s*["']((?:https?://[^/"'\s]+)?{}[^"'#?\s]+)["'#?]"#,
            regex::escape(&config.item_path_prefix)
        ))?;
        let next_rel = Regex::new(r#"(?i)rel\s*=\s*["']next["']"#)?;

        Ok(Self {
            fetcher,
            base_url,
            page_param: config.page_param.clone(),
            max_pages: config.max_pages,
            current_page: 0,
            finished: false,
            hit_page_ceiling: false,
            seen: HashSet::new(),
            item_href,
            next_rel,
        })
    }

    /// Builds the URL of a listing page
    ///
    /// Page 1 is the base URL itself; later pages carry the page parameter.
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            return self.base_url.to_string();
        }

        let mut url = self.base_url.clone();
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != self.page_param.as_str())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair(&self.page_param, &page.to_string());

        url.to_string()
    }

    /// Fetches the next listing page
    ///
    /// Returns `None` once pagination is over. A fetch failure is yielded
    /// once and ends the sequence.
    pub async fn next_page(&mut self) -> Option<Result<ListingPage, FetchError>> {
        if self.finished {
            return None;
        }

        if self.current_page >= self.max_pages {
            self.finished = true;
            self.hit_page_ceiling = true;
            tracing::warn!(
                "Listing still advertises more pages after {} pages; stopping at the ceiling",
                self.max_pages
            );
            return None;
        }

        self.current_page += 1;
        let page_url = self.page_url(self.current_page);
        tracing::debug!("Fetching listing page {}: {}", self.current_page, page_url);

        let html = match self.fetcher.fetch_text(&page_url).await {
            Ok(html) => html,
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        let mut new_urls = Vec::new();
        for url in self.extract_item_urls(&html, &page_url) {
            if self.seen.insert(url.clone()) {
                new_urls.push(url);
            }
        }

        if !self.has_next_page(&html) {
            self.finished = true;
        }

        Some(Ok(ListingPage {
            number: self.current_page,
            new_urls,
        }))
    }

    /// Drains the crawler, keeping URLs gathered before any failure
    pub async fn collect_all(mut self) -> ListingOutcome {
        let mut outcome = ListingOutcome::default();

        while let Some(page) = self.next_page().await {
            match page {
                Ok(page) => {
                    tracing::debug!(
                        "Listing page {} yielded {} new item URLs",
                        page.number,
                        page.new_urls.len()
                    );
                    outcome.pages_fetched += 1;
                    outcome.urls.extend(page.new_urls);
                }
                Err(e) => {
                    tracing::warn!("Listing crawl aborted: {}", e);
                    outcome.failure = Some(e);
                }
            }
        }

        outcome.hit_page_ceiling = self.hit_page_ceiling;
        outcome
    }

    /// Extracts absolute item URLs from a listing page, in document order
    fn extract_item_urls(&self, html: &str, page_url: &str) -> Vec<String> {
        let Ok(page) = Url::parse(page_url) else {
            return Vec::new();
        };

        self.item_href
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .filter_map(|href| page.join(href.as_str()).ok())
            .filter(|url| url.host_str() == self.base_url.host_str())
            .map(|mut url| {
                url.set_query(None);
                url.set_fragment(None);
                url
            })
            .filter(|url| url.path() != self.base_url.path())
            .map(|url| url.to_string())
            .collect()
    }

    /// Checks whether the page links to its successor
    fn has_next_page(&self, html: &str) -> bool {
        let next = self.current_page + 1;
        let pattern = format!(
            r"[?&;]{}={}(?:[^0-9]|$)",
            regex::escape(&self.page_param),
            next
        );

        let links_successor = Regex::new(&pattern)
            .map(|re| re.is_match(html))
            .unwrap_or(false);

        links_successor || self.next_rel.is_match(html)
    }
}
