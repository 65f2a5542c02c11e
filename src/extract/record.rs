//! Listing drafts and retained listing records

use serde::Serialize;

/// Deposit is quoted as this many months of rent
pub const DEPOSIT_MONTHS: f64 = 5.0;

/// Everything extracted from one fragment, before retention is decided
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingDraft {
    pub url: Option<String>,
    pub address: Option<String>,
    pub monthly_price: Option<f64>,
    pub property_type: Option<String>,
    pub size_sqm: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
    pub available_from: Option<String>,
}

impl ListingDraft {
    /// Returns true when this draft may become a record
    ///
    /// Address and price are always required; some sites also require a URL.
    pub fn is_retainable(&self, require_url: bool) -> bool {
        self.address.is_some() && self.monthly_price.is_some() && (!require_url || self.url.is_some())
    }

    /// Converts the draft into a record, or `None` if it fails retention
    pub fn retain(self, require_url: bool) -> Option<ListingRecord> {
        if !self.is_retainable(require_url) {
            return None;
        }

        let address = self.address?;
        let monthly_price = self.monthly_price?;

        Some(ListingRecord {
            url: self.url,
            address,
            monthly_price,
            property_type: self.property_type,
            size_sqm: self.size_sqm,
            latitude: self.latitude,
            longitude: self.longitude,
            deposit: Some(monthly_price * DEPOSIT_MONTHS),
            available_from: self.available_from,
        })
    }
}

/// One retained rental listing
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub url: Option<String>,
    pub address: String,
    pub monthly_price: f64,
    pub property_type: Option<String>,
    pub size_sqm: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
    pub deposit: Option<f64>,
    pub available_from: Option<String>,
}
