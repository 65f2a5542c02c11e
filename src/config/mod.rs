//! Configuration module for Rent-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Proxy credentials and the CAPTCHA service key only ever come from here.
//!
//! # Example
//!
//! ```no_run
//! use rent_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Target records per site: {}", config.crawler.target_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CaptchaConfig, Config, CrawlerConfig, OpenRentConfig, OutputConfig, ProxyEntry,
    RightmoveConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
