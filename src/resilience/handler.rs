//! Resilient page fetching
//!
//! # Attempt Flow
//!
//! | Response | Action |
//! |----------|--------|
//! | HTTP 200 | Return body |
//! | HTTP 403 mentioning a CAPTCHA | Solve, add token, retry without using an attempt |
//! | HTTP 403 otherwise, any other status | Demote-count proxy, use an attempt, retry |
//! | Timeout / connection / body error | Demote-count proxy, use an attempt, back off 2-5s, retry |
//!
//! CAPTCHA rounds are capped separately. An unsolved CAPTCHA uses an attempt
//! without counting against the proxy.

use crate::config::{Config, CrawlerConfig};
use crate::resilience::captcha::{extract_site_key, is_captcha_page, CAPTCHA_TOKEN_PARAM};
use crate::resilience::{
    browser_headers, CaptchaError, CaptchaSolver, FetchError, ProxyLease, ProxyRotator,
    RateLimiter,
};
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{Client, Proxy, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Retry and timeout settings for [`RequestHandler`]
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub max_attempts: u32,
    pub captcha_retries: u32,
    pub request_timeout: Duration,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl HandlerSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            captcha_retries: config.captcha_retries,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            backoff_min: Duration::from_millis(config.backoff_min_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Random delay in `[backoff_min, backoff_max]`; `backoff_min` when the range is empty
    pub fn backoff_delay(&self) -> Duration {
        let min = self.backoff_min.as_millis() as u64;
        let max = self.backoff_max.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// What a single attempt produced
enum AttemptOutcome {
    Success(String),
    Captcha(String),
    Rejected(StatusCode),
    Transport(reqwest::Error),
}

/// Per-crawl request context
///
/// Owns the rate limiter, proxy rotator, CAPTCHA solver and one HTTP client
/// per proxy. Construct one per crawl.
pub struct RequestHandler {
    settings: HandlerSettings,
    rotator: ProxyRotator,
    limiter: RateLimiter,
    solver: Arc<dyn CaptchaSolver>,
    clients: HashMap<usize, Client>,
    backoffs: u32,
}

impl RequestHandler {
    /// Creates a handler from its parts
    pub fn new(
        settings: HandlerSettings,
        rotator: ProxyRotator,
        limiter: RateLimiter,
        solver: Arc<dyn CaptchaSolver>,
    ) -> Self {
        Self {
            settings,
            rotator,
            limiter,
            solver,
            clients: HashMap::new(),
            backoffs: 0,
        }
    }

    /// Creates a handler with a fresh rotator and limiter built from config
    pub fn from_config(config: &Config, solver: Arc<dyn CaptchaSolver>) -> Self {
        Self::new(
            HandlerSettings::from_config(&config.crawler),
            ProxyRotator::from_entries(&config.proxies, config.crawler.proxy_failure_threshold),
            RateLimiter::new(config.crawler.requests_per_minute),
            solver,
        )
    }

    /// The proxy rotator owned by this handler
    pub fn rotator(&self) -> &ProxyRotator {
        &self.rotator
    }

    /// Mutable access to the rotator, e.g. to reset a demoted proxy
    pub fn rotator_mut(&mut self) -> &mut ProxyRotator {
        &mut self.rotator
    }

    /// Backoff sleeps taken after transport errors so far
    pub fn backoff_count(&self) -> u32 {
        self.backoffs
    }

    /// Fetches a page body through the resilience stack
    ///
    /// # Arguments
    ///
    /// * `url` - The page to fetch
    /// * `params` - Query parameters (a CAPTCHA token may be added on retry)
    /// * `headers` - Extra headers merged over the browser defaults
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Body of the first HTTP 200 response
    /// * `Err(FetchError::RetriesExhausted)` - Every attempt failed
    /// * `Err(FetchError::NoHealthyProxy)` - The proxy pool is exhausted
    pub async fn fetch(
        &mut self,
        url: &str,
        params: &[(String, String)],
        headers: &HeaderMap,
    ) -> Result<String, FetchError> {
        let target = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut params = params.to_vec();
        let mut attempts = 0;
        let mut captcha_rounds = 0;

        while attempts < self.settings.max_attempts {
            self.limiter.admit().await;

            let lease = self.rotator.select()?;
            let client = self.client_for(&lease)?;
            let request_headers = browser_headers(headers);

            match send_once(&client, &target, &params, request_headers).await {
                AttemptOutcome::Success(body) => {
                    tracing::debug!(
                        "Fetched {} via {} ({} failed attempts)",
                        url,
                        lease.endpoint,
                        attempts
                    );
                    return Ok(body);
                }

                AttemptOutcome::Captcha(body) => {
                    tracing::info!("CAPTCHA detected on {}, attempting to solve", url);
                    match self.solve_captcha(&body, url, &mut captcha_rounds).await {
                        Ok(token) => {
                            set_param(&mut params, CAPTCHA_TOKEN_PARAM, token);
                            continue;
                        }
                        Err(e) => {
                            tracing::warn!("CAPTCHA on {} unsolved: {}", url, e);
                            attempts += 1;
                        }
                    }
                }

                AttemptOutcome::Rejected(status) => {
                    if status == StatusCode::FORBIDDEN {
                        tracing::warn!("IP possibly blocked on {}, rotating proxy", url);
                    } else {
                        tracing::warn!("Request to {} failed with status {}", url, status);
                    }
                    self.rotator.report_failure(&lease);
                    attempts += 1;
                }

                AttemptOutcome::Transport(e) => {
                    tracing::warn!("Request to {} via {} failed: {}", url, lease.endpoint, e);
                    self.rotator.report_failure(&lease);
                    attempts += 1;

                    if attempts < self.settings.max_attempts {
                        let delay = self.settings.backoff_delay();
                        tracing::debug!("Backing off {:?} before retrying {}", delay, url);
                        tokio::time::sleep(delay).await;
                        self.backoffs += 1;
                    }
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts,
        })
    }

    async fn solve_captcha(
        &self,
        body: &str,
        url: &str,
        rounds: &mut u32,
    ) -> Result<String, CaptchaError> {
        if *rounds >= self.settings.captcha_retries {
            return Err(CaptchaError::BudgetSpent(self.settings.captcha_retries));
        }
        *rounds += 1;

        let site_key = extract_site_key(body).ok_or(CaptchaError::MissingSiteKey)?;
        self.solver.solve(&site_key, url).await
    }

    fn client_for(&mut self, lease: &ProxyLease) -> Result<Client, FetchError> {
        if let Some(client) = self.clients.get(&lease.index) {
            return Ok(client.clone());
        }

        let proxy = Proxy::all(&lease.endpoint)?.basic_auth(&lease.username, &lease.password);
        let client = Client::builder()
            .proxy(proxy)
            .timeout(self.settings.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        self.clients.insert(lease.index, client.clone());
        Ok(client)
    }

}

async fn send_once(
    client: &Client,
    target: &Url,
    params: &[(String, String)],
    headers: HeaderMap,
) -> AttemptOutcome {
    let response = match client
        .get(target.clone())
        .query(params)
        .headers(headers)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return AttemptOutcome::Transport(e),
    };

    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return AttemptOutcome::Transport(e),
    };

    if status == StatusCode::OK {
        AttemptOutcome::Success(body)
    } else if status == StatusCode::FORBIDDEN && is_captcha_page(&body) {
        AttemptOutcome::Captcha(body)
    } else {
        AttemptOutcome::Rejected(status)
    }
}

fn set_param(params: &mut Vec<(String, String)>, key: &str, value: String) {
    match params.iter_mut().find(|(name, _)| name == key) {
        Some(entry) => entry.1 = value,
        None => params.push((key.to_string(), value)),
    }
}
