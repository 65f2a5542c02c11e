//! Rent-Sweep main entry point
//!
//! This is the command-line trigger for the Rent-Sweep listing harvester.

use clap::Parser;
use rent_sweep::config::Config;
use rent_sweep::crawler::SiteProfile;
use rent_sweep::output::{output_path, print_statistics};
use rent_sweep::trigger::{self, SiteSelector, TriggerOutcome};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Rent-Sweep: a resilient rental listing harvester
///
/// Rent-Sweep crawls Rightmove and OpenRent search results through rotating
/// proxies with rate limiting and CAPTCHA solving, and exports the listings
/// it finds as `<site>_data.csv`.
#[derive(Parser, Debug)]
#[command(name = "rent-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A resilient rental listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Site to crawl
    #[arg(long, value_enum, ignore_case = true)]
    site: SiteSelector,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match trigger::load_config_outcome(&cli.config) {
        Ok(loaded) => loaded,
        Err(outcome) => return report_failure(outcome),
    };
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.site);
        return ExitCode::SUCCESS;
    }

    let outcome = handle_run(&config, cli.site).await;
    println!("{}", outcome);

    if let TriggerOutcome::Success { statistics, .. } = &outcome {
        if !cli.quiet {
            for stats in statistics {
                println!();
                print_statistics(stats);
            }
        }
    }

    ExitCode::from(outcome.exit_code())
}

/// Prints an error outcome that ended the run before any crawl started
fn report_failure(outcome: TriggerOutcome) -> ExitCode {
    if let TriggerOutcome::Error { message } = &outcome {
        tracing::error!("{}", message);
    }
    println!("{}", outcome);
    ExitCode::from(outcome.exit_code())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("rent_sweep=info,warn"),
            1 => EnvFilter::new("rent_sweep=debug,info"),
            2 => EnvFilter::new("rent_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, selector: SiteSelector) {
    println!("=== Rent-Sweep Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Target listings per site: {}", config.crawler.target_count);
    println!("  Max attempts per page: {}", config.crawler.max_attempts);
    println!("  CAPTCHA rounds per page: {}", config.crawler.captcha_retries);
    println!(
        "  Requests per minute: {}",
        config.crawler.requests_per_minute
    );
    println!(
        "  Backoff: {}-{}ms",
        config.crawler.backoff_min_ms, config.crawler.backoff_max_ms
    );
    match config.crawler.crawl_deadline_secs {
        0 => println!("  Deadline: none"),
        secs => println!("  Deadline: {}s", secs),
    }

    println!("\nProxies ({}):", config.proxies.len());
    for proxy in &config.proxies {
        println!("  - {}:{}", proxy.host, proxy.port);
    }

    println!("\nCAPTCHA Service:");
    println!("  API base: {}", config.captcha.api_base);

    println!("\nSites:");
    for site in selector.sites() {
        let profile = SiteProfile::for_site(site, config);
        println!("  - {} ({})", site, profile.base_url);
        println!(
            "    first page query: {:?}",
            profile.page_params(1)
        );
        println!(
            "    output: {}",
            output_path(Path::new(&config.output.directory), site).display()
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_run(config: &Config, selector: SiteSelector) -> TriggerOutcome {
    tracing::info!(
        "Crawling {:?} with {} proxies, {} requests/minute",
        selector,
        config.proxies.len(),
        config.crawler.requests_per_minute
    );

    let outcome = trigger::run_with_service(config, selector).await;
    match &outcome {
        TriggerOutcome::Success { message, .. } => tracing::info!("{}", message),
        TriggerOutcome::Error { message } => tracing::error!("Run failed: {}", message),
    }

    outcome
}
