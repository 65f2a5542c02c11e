//! CAPTCHA detection and solving
//!
//! Blocked pages come back as HTTP 403. When such a page mentions a CAPTCHA,
//! its reCAPTCHA site key is handed to an external solving service and the
//! returned token is sent back with the next request.

use crate::config::CaptchaConfig;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Query parameter carrying a solved token on the retried request
pub const CAPTCHA_TOKEN_PARAM: &str = "g-recaptcha-response";

/// 2Captcha answer while a job is still being worked on
const NOT_READY: &str = "CAPCHA_NOT_READY";

/// Reasons a CAPTCHA could not be solved
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("no reCAPTCHA site key found in page")]
    MissingSiteKey,

    #[error("CAPTCHA retry budget of {0} rounds spent")]
    BudgetSpent(u32),

    #[error("solving service rejected the job: {0}")]
    Service(String),

    #[error("solving service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no answer after {0} polls")]
    Timeout(u32),
}

/// External service turning a site key into a solution token
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Solves the reCAPTCHA identified by `site_key` on `page_url`
    async fn solve(&self, site_key: &str, page_url: &str) -> Result<String, CaptchaError>;
}

/// Returns true if a blocked response body looks like a CAPTCHA challenge
pub fn is_captcha_page(body: &str) -> bool {
    body.to_lowercase().contains("captcha")
}

static RE_SITE_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"data-sitekey="([^"]+)""#).ok());

/// Pulls the reCAPTCHA site key out of a challenge page
pub fn extract_site_key(body: &str) -> Option<String> {
    RE_SITE_KEY
        .as_ref()?
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Deserialize)]
struct ApiAnswer {
    status: i64,
    request: String,
}

/// Client for the 2Captcha HTTP API
pub struct TwoCaptchaSolver {
    client: Client,
    api_key: String,
    api_base: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl TwoCaptchaSolver {
    /// Creates a solver from the `[captcha]` config section
    pub fn new(config: &CaptchaConfig) -> Result<Self, CaptchaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: config.service_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
        })
    }

    async fn call(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<ApiAnswer, CaptchaError> {
        let text = self
            .client
            .get(format!("{}/{}", self.api_base, endpoint))
            .query(query)
            .send()
            .await?
            .text()
            .await?;

        // Errors are sometimes returned as bare text such as "ERROR_WRONG_USER_KEY"
        serde_json::from_str(&text).map_err(|_| CaptchaError::Service(text.trim().to_string()))
    }
}

#[async_trait]
impl CaptchaSolver for TwoCaptchaSolver {
    async fn solve(&self, site_key: &str, page_url: &str) -> Result<String, CaptchaError> {
        let submitted = self
            .call(
                "in.php",
                &[
                    ("key", self.api_key.as_str()),
                    ("method", "userrecaptcha"),
                    ("googlekey", site_key),
                    ("pageurl", page_url),
                    ("json", "1"),
                ],
            )
            .await?;

        if submitted.status != 1 {
            return Err(CaptchaError::Service(submitted.request));
        }

        let job_id = submitted.request;
        tracing::info!("CAPTCHA job {} submitted for {}", job_id, page_url);

        for _ in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let answer = self
                .call(
                    "res.php",
                    &[
                        ("key", self.api_key.as_str()),
                        ("action", "get"),
                        ("id", job_id.as_str()),
                        ("json", "1"),
                    ],
                )
                .await?;

            if answer.status == 1 {
                tracing::info!("CAPTCHA job {} solved", job_id);
                return Ok(answer.request);
            }

            if answer.request != NOT_READY {
                return Err(CaptchaError::Service(answer.request));
            }
        }

        Err(CaptchaError::Timeout(self.max_polls))
    }
}
