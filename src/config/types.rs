use serde::Deserialize;

/// Main configuration structure for Rent-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub captcha: CaptchaConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub proxies: Vec<ProxyEntry>,
    #[serde(default)]
    pub rightmove: RightmoveConfig,
    #[serde(default)]
    pub openrent: OpenRentConfig,
}

/// Crawl loop and request resilience settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Number of records after which a crawl stops
    pub target_count: usize,

    /// Outer attempts per page fetch
    pub max_attempts: u32,

    /// CAPTCHA solve rounds allowed per page fetch, separate from `max_attempts`
    pub captcha_retries: u32,

    /// Admissions allowed in any trailing 60 second window
    pub requests_per_minute: usize,

    /// Per HTTP call timeout (seconds)
    pub request_timeout_secs: u64,

    /// Lower bound of the backoff after a transport error (milliseconds)
    pub backoff_min_ms: u64,

    /// Upper bound of the backoff after a transport error (milliseconds)
    pub backoff_max_ms: u64,

    /// Failed pages in a row after which a crawl gives up
    pub max_consecutive_failures: u32,

    /// Wall-clock ceiling for one crawl (seconds, 0 disables)
    pub crawl_deadline_secs: u64,

    /// Failures after which a proxy is no longer selected
    pub proxy_failure_threshold: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            target_count: 1000,
            max_attempts: 3,
            captcha_retries: 3,
            requests_per_minute: 20,
            request_timeout_secs: 30,
            backoff_min_ms: 2000,
            backoff_max_ms: 5000,
            max_consecutive_failures: 5,
            crawl_deadline_secs: 3600,
            proxy_failure_threshold: 3,
        }
    }
}

/// CAPTCHA-solving service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CaptchaConfig {
    /// API key of the solving service
    pub service_key: String,

    /// Base URL of the 2Captcha compatible API
    #[serde(default = "default_captcha_api_base")]
    pub api_base: String,

    /// Delay between result polls (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of result polls before giving up
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_captcha_api_base() -> String {
    "https://2captcha.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_max_polls() -> u32 {
    24
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Directory receiving `<site>_data.csv`
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
        }
    }
}

/// One outbound proxy
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyEntry {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Rightmove search parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RightmoveConfig {
    pub base_url: String,
    pub location_identifier: String,
    pub property_type: String,
    pub max_price: u32,
}

impl Default for RightmoveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.rightmove.co.uk/property-to-rent/find.html".to_string(),
            location_identifier: "REGION^93917".to_string(),
            property_type: "flat".to_string(),
            max_price: 5000,
        }
    }
}

/// OpenRent search parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OpenRentConfig {
    pub base_url: String,
}

impl Default for OpenRentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.openrent.co.uk/properties-to-rent/london".to_string(),
        }
    }
}
