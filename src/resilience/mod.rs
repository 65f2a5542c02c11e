//! Request resilience layer
//!
//! This module wraps every outbound page request in:
//! - A sliding one-minute rate limiter
//! - Least-recently-used proxy rotation with failure demotion
//! - CAPTCHA detection and solving through an external service
//! - Bounded retries with randomized backoff on transport errors
//!
//! Each crawl builds its own [`RequestHandler`], so no two crawls share a
//! rate budget or proxy health.

mod captcha;
mod handler;
mod headers;
mod proxy;
mod rate_limiter;

pub use captcha::{
    extract_site_key, is_captcha_page, CaptchaError, CaptchaSolver, TwoCaptchaSolver,
    CAPTCHA_TOKEN_PARAM,
};
pub use handler::{HandlerSettings, RequestHandler};
pub use headers::{browser_headers, random_user_agent, USER_AGENTS};
pub use proxy::{ProxyDescriptor, ProxyLease, ProxyRotator};
pub use rate_limiter::RateLimiter;

use thiserror::Error;

/// Errors surfaced by [`RequestHandler::fetch`]
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every outer attempt failed; the caller should skip this page
    #[error("Retries exhausted for {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    /// Every proxy in the pool has been demoted; the crawl cannot continue
    #[error("No healthy proxy left in the pool")]
    NoHealthyProxy,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid request URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

impl FetchError {
    /// Returns true if this error only affects the page being fetched
    pub fn is_page_local(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. } | Self::InvalidUrl { .. })
    }
}
