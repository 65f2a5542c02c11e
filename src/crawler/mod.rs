//! Crawler module for walking a listing site's results pages
//!
//! This module contains the site crawling logic, including:
//! - Per-site profiles (search URL, pagination, card and field selectors)
//! - Results-page parsing into listing drafts
//! - The crawl loop with its stop conditions

mod coordinator;
mod parser;
mod site;

pub use coordinator::{crawl_site, CrawlReport, CrawlSettings, SiteCrawler, StopReason};
pub use parser::{extract_listing, parse_page, ParsedPage};
pub use site::{Coordinates, FieldRules, Pagination, Site, SiteProfile, RIGHTMOVE_PAGE_SIZE};
