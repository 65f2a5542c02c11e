//! Crawl statistics derived from a finished crawl
//!
//! This module condenses a [`CrawlReport`] into the figures printed at the
//! end of a run.

use crate::crawler::{CrawlReport, Site, StopReason};

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    pub site: Site,

    /// Records retained (before the export cap)
    pub listings: usize,

    pub pages_visited: u32,
    pub failed_pages: Vec<u32>,

    /// Fragments dropped by the retention predicate
    pub dropped_fragments: usize,

    pub duplicates: usize,
    pub proxy_failures: u32,
    pub healthy_proxies: usize,
    pub stop_reason: StopReason,
    pub duration_seconds: i64,

    /// Mean monthly price over retained records
    pub average_price: Option<f64>,

    /// Records carrying a size in square meters
    pub with_size: usize,
}

impl CrawlStatistics {
    /// Builds statistics from a crawl report
    pub fn from_report(report: &CrawlReport) -> Self {
        let listings = report.records.len();
        let average_price = if listings > 0 {
            let total: f64 = report.records.iter().map(|r| r.monthly_price).sum();
            Some(total / listings as f64)
        } else {
            None
        };

        Self {
            site: report.site,
            listings,
            pages_visited: report.pages_visited,
            failed_pages: report.failed_pages.clone(),
            dropped_fragments: report.dropped_fragments,
            duplicates: report.duplicates,
            proxy_failures: report.proxy_failures,
            healthy_proxies: report.healthy_proxies,
            stop_reason: report.stop_reason,
            duration_seconds: report.elapsed().num_seconds(),
            average_price,
            with_size: report.records.iter().filter(|r| r.size_sqm.is_some()).count(),
        }
    }

    /// Share of visited pages that yielded listing cards, in percent
    pub fn page_success_rate(&self) -> f64 {
        if self.pages_visited == 0 {
            return 0.0;
        }
        let succeeded = self.pages_visited as usize - self.failed_pages.len();
        (succeeded as f64 / self.pages_visited as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== {} Crawl Statistics ===\n", stats.site);

    println!("Overview:");
    println!("  Listings collected: {}", stats.listings);
    println!("  Pages visited: {}", stats.pages_visited);
    println!("  Stopped: {}", stats.stop_reason);
    println!("  Duration: {}s", stats.duration_seconds);
    println!();

    println!("Listings:");
    match stats.average_price {
        Some(price) => println!("  Average monthly price: £{:.2}", price),
        None => println!("  Average monthly price: n/a"),
    }
    println!("  With size: {}", stats.with_size);
    println!("  Dropped fragments: {}", stats.dropped_fragments);
    println!("  Duplicates skipped: {}", stats.duplicates);
    println!();

    println!("Resilience:");
    println!("  Proxy failures: {}", stats.proxy_failures);
    println!("  Healthy proxies remaining: {}", stats.healthy_proxies);
    if !stats.failed_pages.is_empty() {
        println!("  Failed pages: {:?}", stats.failed_pages);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} pages yielded listings)",
        stats.page_success_rate(),
        stats.pages_visited as usize - stats.failed_pages.len(),
        stats.pages_visited
    );
}
