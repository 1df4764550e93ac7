//! Crawler module for catalog page retrieval
//!
//! This module contains the network-facing half of the synchronizer:
//! - HTTP fetching with a bot-identifying user agent
//! - Walking the paginated catalog listing to collect item URLs

mod fetcher;
mod listing;

pub use fetcher::{build_http_client, HttpFetcher, PageFetcher};
pub use listing::{ListingCrawler, ListingOutcome, ListingPage};
