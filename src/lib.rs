//! Rent-Sweep: a resilient rental listing harvester
//!
//! This crate fetches rental listing pages from Rightmove and OpenRent through
//! rotating proxies, a sliding-window rate limiter and CAPTCHA solving, extracts
//! typed listing records from the HTML and exports them as CSV.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod resilience;
pub mod state;
pub mod trigger;

use thiserror::Error;

/// Main error type for Rent-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] resilience::FetchError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Rent-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Site, SiteCrawler, StopReason};
pub use extract::ListingRecord;
pub use state::PageState;
