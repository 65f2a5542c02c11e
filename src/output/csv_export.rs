//! CSV export of retained listing records

use crate::crawler::{CrawlReport, Site};
use crate::extract::ListingRecord;
use crate::SweepError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order of every export, matching [`ListingRecord`]'s field order
pub const CSV_HEADER: [&str; 9] = [
    "url",
    "address",
    "monthly_price",
    "property_type",
    "size_sqm",
    "latitude",
    "longitude",
    "deposit",
    "available_from",
];

/// Writes a header and at most `cap` records to `writer`
///
/// Absent fields become empty cells. The header is written even when there
/// are no records.
///
/// # Returns
///
/// * `Ok(usize)` - Number of records written
/// * `Err(SweepError)` - Serialization or IO failure
pub fn write_csv<W: Write>(
    writer: W,
    records: &[ListingRecord],
    cap: usize,
) -> Result<usize, SweepError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(CSV_HEADER)?;

    let mut written = 0;
    for record in records.iter().take(cap) {
        csv_writer.serialize(record)?;
        written += 1;
    }

    csv_writer.flush()?;
    Ok(written)
}

/// Path of a site's export inside `directory`
pub fn output_path(directory: &Path, site: Site) -> PathBuf {
    directory.join(site.output_file_name())
}

/// Writes a crawl's records to `<directory>/<site>_data.csv`
///
/// Creates `directory` if it does not exist. An existing file is replaced.
pub fn export_report(
    report: &CrawlReport,
    directory: &Path,
    cap: usize,
) -> Result<PathBuf, SweepError> {
    fs::create_dir_all(directory)?;

    let path = output_path(directory, report.site);
    let file = File::create(&path)?;
    let written = write_csv(file, &report.records, cap)?;

    tracing::info!("Results saved to {} ({} listings)", path.display(), written);
    Ok(path)
}
