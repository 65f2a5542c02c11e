//! Output module for exporting crawl results
//!
//! This module handles:
//! - Writing retained records to `<site>_data.csv`
//! - Summarizing a finished crawl for the console

mod csv_export;
pub mod stats;

pub use csv_export::{export_report, output_path, write_csv, CSV_HEADER};
pub use stats::{print_statistics, CrawlStatistics};
