//! Field extraction from listing fragments
//!
//! This module turns one parsed listing card into a typed record:
//! - Ordered fallback rules per field (first non-empty match wins)
//! - Price, size, address and coordinate normalization
//! - The retention predicate deciding which drafts become records
//!
//! Nothing in here returns an error to the caller. Malformed field text
//! degrades that field to `None`.

mod clean;
mod fields;
mod record;

pub use clean::{
    clean_address, clean_price, extract_size, parse_coordinate, parse_lat_lng, FieldParseError,
};
pub use fields::{extract, FieldRule, RuleList};
pub(crate) use fields::compile_selectors;
pub use record::{ListingDraft, ListingRecord, DEPOSIT_MONTHS};
