//! HTTP page fetcher
//!
//! This module handles every HTTP request the synchronizer makes:
//! - Building an HTTP client with a bot-identifying user agent
//! - GET requests returning the page body as text
//! - Mapping non-success statuses and transport failures to `FetchError`
//!
//! There is no retry at this layer; callers decide what a failure means.

use crate::config::{CatalogConfig, UserAgentConfig};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Source of raw page text
///
/// The synchronizer only ever needs "give me the body of this URL", so the
/// network layer is reduced to that one operation. Tests substitute their own
/// implementations.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the response body
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use tour_sync::config::UserAgentConfig;
/// use tour_sync::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "TourSync".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, 30).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `PageFetcher` backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from the crawler configuration
    pub fn from_config(
        user_agent: &UserAgentConfig,
        catalog: &CatalogConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, catalog.request_timeout_secs)?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        tracing::trace!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| transport_error(url, &e))
    }
}

/// Classifies a reqwest failure into a transport error
fn transport_error(url: &str, error: &reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection refused".to_string()
    } else {
        error.to_string()
    };

    FetchError::Transport {
        url: url.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        assert!(build_http_client(&config, 5).is_ok());
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            create_test_config().header_value(),
            "TestCrawler/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_fetch_error_accessors() {
        let err = FetchError::Status {
            url: "https://example.com/x".to_string(),
            status: 503,
        };
        assert_eq!(err.url(), "https://example.com/x");
        assert_eq!(err.status(), Some(503));

        let err = FetchError::Transport {
            url: "https://example.com/y".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status(), None);
    }
}
