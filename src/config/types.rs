use serde::Deserialize;

/// Main configuration structure for Tour-Sync
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Source catalog and synchronization behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogConfig {
    /// First page of the paginated catalog listing
    pub base_url: String,

    /// Path prefix shared by every catalog item URL (e.g. "/tours/")
    pub item_path_prefix: String,

    /// Query parameter carrying the listing page number
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Hard ceiling on listing pages fetched per run
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Pause between item page fetches (milliseconds)
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,

    /// Prefix of every reconciliation key written by this source
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Currency assumed when the item page does not state one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Whether to consult the source's robots.txt before fetching items
    #[serde(default = "default_respect_robots")]
    pub respect_robots: bool,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown report of the last run
    #[serde(rename = "summary-path")]
    pub summary_path: String,

    /// Age after which a run still marked as running is considered abandoned (seconds)
    #[serde(rename = "run-lease-secs", default = "default_run_lease_secs")]
    pub run_lease_secs: u64,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_max_pages() -> u32 {
    30
}

fn default_item_delay_ms() -> u64 {
    500
}

fn default_key_prefix() -> String {
    "tour".to_string()
}

fn default_currency() -> String {
    "RUB".to_string()
}

fn default_respect_robots() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_run_lease_secs() -> u64 {
    3600
}
