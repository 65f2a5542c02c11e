//! Run trigger: crawl the selected site(s) and export their records
//!
//! The trigger is the outer boundary of a run. Whatever happens below it, it
//! returns a [`TriggerOutcome`] rather than an error.

use crate::config::{load_config_with_hash, Config};
use crate::crawler::{crawl_site, CrawlReport, Site};
use crate::output::{export_report, CrawlStatistics};
use crate::resilience::{CaptchaSolver, TwoCaptchaSolver};
use crate::SweepError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which site(s) a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SiteSelector {
    Rightmove,
    #[value(name = "openrent")]
    OpenRent,
    All,
}

impl SiteSelector {
    /// Sites covered by this selector, in crawl order
    pub fn sites(&self) -> Vec<Site> {
        match self {
            Self::Rightmove => vec![Site::Rightmove],
            Self::OpenRent => vec![Site::OpenRent],
            Self::All => Site::ALL.to_vec(),
        }
    }
}

/// Structured result of a triggered run
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    Success {
        message: String,
        files: Vec<PathBuf>,
        statistics: Vec<CrawlStatistics>,
    },
    Error {
        message: String,
    },
}

impl TriggerOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// JSON rendering: `{"message", "files"}` or `{"error"}`
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Success { message, files, .. } => serde_json::json!({
                "message": message,
                "files": files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
            }),
            Self::Error { message } => serde_json::json!({ "error": message }),
        }
    }
}

impl fmt::Display for TriggerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Loads the configuration file and the hash of its text
///
/// A file that cannot be read, parsed or validated becomes an error outcome
/// so the caller can report it like any other failed run.
pub fn load_config_outcome(path: &Path) -> Result<(Config, String), TriggerOutcome> {
    load_config_with_hash(path).map_err(|e| TriggerOutcome::Error {
        message: format!("Failed to load configuration from {}: {}", path.display(), e),
    })
}

/// Crawls one site and writes its CSV export
async fn crawl_and_export(
    site: Site,
    config: &Config,
    solver: Arc<dyn CaptchaSolver>,
) -> Result<(CrawlReport, PathBuf), SweepError> {
    let report = crawl_site(site, config, solver).await?;
    let path = export_report(
        &report,
        Path::new(&config.output.directory),
        config.crawler.target_count,
    )?;
    Ok((report, path))
}

/// Runs the crawl(s) named by `selector`
///
/// With [`SiteSelector::All`] both crawls run concurrently. They share only
/// the CAPTCHA solver. A site that finishes still has its CSV written even
/// when the other one fails, but the run as a whole is reported as an error.
pub async fn run(
    config: &Config,
    selector: SiteSelector,
    solver: Arc<dyn CaptchaSolver>,
) -> TriggerOutcome {
    let results = match selector {
        SiteSelector::Rightmove => {
            vec![(Site::Rightmove, crawl_and_export(Site::Rightmove, config, solver).await)]
        }
        SiteSelector::OpenRent => {
            vec![(Site::OpenRent, crawl_and_export(Site::OpenRent, config, solver).await)]
        }
        SiteSelector::All => {
            let (rightmove, openrent) = tokio::join!(
                crawl_and_export(Site::Rightmove, config, solver.clone()),
                crawl_and_export(Site::OpenRent, config, solver),
            );
            vec![(Site::Rightmove, rightmove), (Site::OpenRent, openrent)]
        }
    };

    let mut files = Vec::new();
    let mut statistics = Vec::new();
    let mut failures = Vec::new();

    for (site, result) in results {
        match result {
            Ok((report, path)) => {
                statistics.push(CrawlStatistics::from_report(&report));
                files.push(path);
            }
            Err(e) => {
                tracing::error!("{} run failed: {}", site, e);
                failures.push(format!("{}: {}", site, e));
            }
        }
    }

    if !failures.is_empty() {
        return TriggerOutcome::Error {
            message: failures.join("; "),
        };
    }

    let message = match (selector, files.as_slice()) {
        (SiteSelector::All, _) => "Scraping for both sites complete".to_string(),
        (_, [file]) => format!("{} scraping complete -> {}", selector_label(selector), file.display()),
        _ => "Scraping complete".to_string(),
    };

    TriggerOutcome::Success {
        message,
        files,
        statistics,
    }
}

/// Builds the CAPTCHA service client from `config` and runs the crawl(s)
pub async fn run_with_service(config: &Config, selector: SiteSelector) -> TriggerOutcome {
    match TwoCaptchaSolver::new(&config.captcha) {
        Ok(solver) => run(config, selector, Arc::new(solver)).await,
        Err(e) => TriggerOutcome::Error {
            message: format!("Failed to create CAPTCHA solver client: {}", e),
        },
    }
}

fn selector_label(selector: SiteSelector) -> &'static str {
    match selector {
        SiteSelector::Rightmove => "Rightmove",
        SiteSelector::OpenRent => "OpenRent",
        SiteSelector::All => "All",
    }
}
