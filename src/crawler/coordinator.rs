//! Crawler coordinator - the per-site crawl loop
//!
//! This module walks a site's results pages one at a time:
//! - Fetching each page through the resilience layer
//! - Parsing listing cards into drafts
//! - Retaining and de-duplicating records until the target is met
//! - Stopping on exhaustion, a failure streak or the crawl deadline

use crate::config::Config;
use crate::crawler::parser::parse_page;
use crate::crawler::site::{Site, SiteProfile};
use crate::extract::ListingRecord;
use crate::resilience::{CaptchaSolver, FetchError, RequestHandler};
use crate::state::{PageState, PageTracker};
use crate::SweepError;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The record buffer reached the target count
    TargetReached,

    /// The site reported it has no further results
    Exhausted,

    /// Too many pages in a row failed
    FailureStreak,

    /// The crawl ran past its deadline
    DeadlineExceeded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TargetReached => "target reached",
            Self::Exhausted => "results exhausted",
            Self::FailureStreak => "too many consecutive page failures",
            Self::DeadlineExceeded => "crawl deadline exceeded",
        };
        write!(f, "{}", text)
    }
}

/// Limits governing a single crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub target_count: usize,
    pub max_consecutive_failures: u32,

    /// `None` disables the deadline
    pub deadline: Option<Duration>,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        let deadline = match config.crawler.crawl_deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            target_count: config.crawler.target_count,
            max_consecutive_failures: config.crawler.max_consecutive_failures,
            deadline,
        }
    }
}

/// Outcome of one site crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub site: Site,

    /// Retained records, never more than the target count
    pub records: Vec<ListingRecord>,

    /// 1-based numbers of pages that failed
    pub failed_pages: Vec<u32>,

    pub pages_visited: u32,

    /// Fragments that failed retention
    pub dropped_fragments: usize,

    /// Records skipped because their URL was already collected
    pub duplicates: usize,

    /// Proxy failures counted across the crawl
    pub proxy_failures: u32,

    pub healthy_proxies: usize,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Wall-clock duration of the crawl
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Main crawler structure for one site
pub struct SiteCrawler {
    profile: SiteProfile,
    handler: RequestHandler,
    settings: CrawlSettings,
}

impl SiteCrawler {
    /// Creates a crawler with a fresh request context
    ///
    /// # Arguments
    ///
    /// * `profile` - Selectors and pagination for the site
    /// * `config` - Validated configuration
    /// * `solver` - CAPTCHA solver shared with other crawls
    pub fn new(profile: SiteProfile, config: &Config, solver: Arc<dyn CaptchaSolver>) -> Self {
        Self {
            profile,
            handler: RequestHandler::from_config(config, solver),
            settings: CrawlSettings::from_config(config),
        }
    }

    /// Creates a crawler around an existing handler
    pub fn with_handler(
        profile: SiteProfile,
        handler: RequestHandler,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            profile,
            handler,
            settings,
        }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// Runs the crawl loop until a stop condition is met
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl stopped normally
    /// * `Err(SweepError)` - The proxy pool was exhausted or the base URL is invalid
    pub async fn crawl(&mut self) -> Result<CrawlReport, SweepError> {
        let site = self.profile.site;
        let started_at = Utc::now();
        let clock = Instant::now();

        let page_url = Url::parse(&self.profile.base_url).map_err(|source| {
            FetchError::InvalidUrl {
                url: self.profile.base_url.clone(),
                source,
            }
        })?;
        let headers = HeaderMap::new();

        tracing::info!(
            "Starting {} crawl, target {} listings",
            site,
            self.settings.target_count
        );

        let mut records: Vec<ListingRecord> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut failed_pages = Vec::new();
        let mut consecutive_failures = 0;
        let mut dropped_fragments = 0;
        let mut duplicates = 0;
        let mut pages_visited = 0;
        let mut page = 1;

        let stop_reason = loop {
            if records.len() >= self.settings.target_count {
                break StopReason::TargetReached;
            }

            if let Some(deadline) = self.settings.deadline {
                if clock.elapsed() >= deadline {
                    tracing::warn!("{} crawl passed its deadline of {:?}", site, deadline);
                    break StopReason::DeadlineExceeded;
                }
            }

            if consecutive_failures >= self.settings.max_consecutive_failures {
                tracing::warn!(
                    "{} crawl stopping after {} consecutive failed pages",
                    site,
                    consecutive_failures
                );
                break StopReason::FailureStreak;
            }

            let mut tracker = PageTracker::start(page);
            pages_visited += 1;

            let params = self.profile.page_params(page);
            let body = match self
                .handler
                .fetch(&self.profile.base_url, &params, &headers)
                .await
            {
                Ok(body) => body,
                Err(e) if e.is_page_local() => {
                    tracing::warn!("Failed to fetch {} page {}: {}", site, page, e);
                    tracker.advance(PageState::Failed)?;
                    failed_pages.push(page);
                    consecutive_failures += 1;
                    page += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        "{} crawl aborted on page {} with {} listings collected: {}",
                        site,
                        page,
                        records.len(),
                        e
                    );
                    return Err(e.into());
                }
            };

            tracker.advance(PageState::Parsing)?;
            let parsed = parse_page(&body, &page_url, &self.profile);

            if parsed.fragment_count == 0 {
                if parsed.no_results {
                    tracing::info!("{} page {} reports no more results", site, page);
                    tracker.advance(PageState::Done)?;
                    break StopReason::Exhausted;
                }

                tracing::warn!("No properties found on {} page {}", site, page);
                tracker.advance(PageState::Failed)?;
                failed_pages.push(page);
                consecutive_failures += 1;
                page += 1;
                continue;
            }

            consecutive_failures = 0;
            tracker.advance(PageState::Accumulating)?;

            for draft in parsed.drafts {
                if records.len() >= self.settings.target_count {
                    break;
                }

                let Some(record) = draft.retain(self.profile.require_url) else {
                    dropped_fragments += 1;
                    continue;
                };

                if let Some(url) = &record.url {
                    if !seen_urls.insert(url.clone()) {
                        duplicates += 1;
                        continue;
                    }
                }

                tracing::debug!("Scraped property: {}", record.address);
                records.push(record);
            }

            tracing::info!(
                "Progress: {} page {} done, {}/{} listings, {} failed pages",
                site,
                page,
                records.len(),
                self.settings.target_count,
                failed_pages.len()
            );

            if records.len() >= self.settings.target_count {
                tracker.advance(PageState::Done)?;
                break StopReason::TargetReached;
            }

            tracker.advance(PageState::NextPage)?;
            page += 1;
        };

        tracing::info!(
            "{} crawl finished ({}): {} listings from {} pages",
            site,
            stop_reason,
            records.len(),
            pages_visited
        );
        if !failed_pages.is_empty() {
            tracing::warn!("{} failed pages: {:?}", site, failed_pages);
        }

        let rotator = self.handler.rotator();
        Ok(CrawlReport {
            site,
            records,
            failed_pages,
            pages_visited,
            dropped_fragments,
            duplicates,
            proxy_failures: rotator.total_failures(),
            healthy_proxies: rotator.healthy_count(),
            stop_reason,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Runs a complete crawl of one site
///
/// This is the main entry point for crawling a single site. It builds the
/// site profile and a fresh request context from `config`.
pub async fn crawl_site(
    site: Site,
    config: &Config,
    solver: Arc<dyn CaptchaSolver>,
) -> Result<CrawlReport, SweepError> {
    let profile = SiteProfile::for_site(site, config);
    SiteCrawler::new(profile, config, solver).crawl().await
}
