//! Robots.txt handling
//!
//! The catalog lives on a single origin, so robots.txt is fetched once per
//! run through the same [`PageFetcher`] as every other page and consulted
//! before each item fetch.

mod policy;

pub use policy::RobotsPolicy;

use crate::crawler::PageFetcher;
use url::Url;

/// Fetches and parses robots.txt for the origin of `base_url`
///
/// Never fails: a missing, unreachable or non-success robots file means
/// everything is allowed.
pub async fn fetch_robots<F: PageFetcher + ?Sized>(fetcher: &F, base_url: &Url) -> RobotsPolicy {
    let robots_url = match base_url.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Cannot build robots.txt URL from {}: {}", base_url, e);
            return RobotsPolicy::allow_all();
        }
    };

    match fetcher.fetch_text(robots_url.as_str()).await {
        Ok(content) => {
            tracing::debug!("Loaded robots.txt from {}", robots_url);
            RobotsPolicy::from_content(&content)
        }
        Err(e) => {
            tracing::info!("No usable robots.txt ({}); allowing all", e);
            RobotsPolicy::allow_all()
        }
    }
}
