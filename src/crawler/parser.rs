//! Results-page parsing
//!
//! Turns a fetched body into listing drafts. Parsing is synchronous and
//! returns owned data only, so no DOM value outlives this module.

use crate::crawler::site::{Coordinates, FieldRules, SiteProfile};
use crate::extract::{
    clean_address, clean_price, extract, extract_size, parse_coordinate, parse_lat_lng,
    ListingDraft,
};
use scraper::{ElementRef, Html};
use url::Url;

/// What one results page contained
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// One draft per listing card, in document order
    pub drafts: Vec<ListingDraft>,

    /// Number of listing cards found
    pub fragment_count: usize,

    /// True when the page had no cards and carried a "no results" marker
    pub no_results: bool,
}

/// Parses a results page with the given site profile
///
/// # Arguments
///
/// * `html` - The page body
/// * `page_url` - URL the body was fetched from, used to resolve listing links
/// * `profile` - Card selectors and field rules for the site
///
/// # Example
///
/// ```
/// use rent_sweep::config::OpenRentConfig;
/// use rent_sweep::crawler::{parse_page, SiteProfile};
/// use url::Url;
///
/// let profile = SiteProfile::openrent(&OpenRentConfig::default());
/// let html = r#"<div class="property"><div class="location">1 Road</div>
///     <div class="price"><strong>£900</strong></div></div>"#;
/// let page = Url::parse("https://www.openrent.co.uk/properties-to-rent/london").unwrap();
///
/// let parsed = parse_page(html, &page, &profile);
/// assert_eq!(parsed.fragment_count, 1);
/// assert_eq!(parsed.drafts[0].monthly_price, Some(900.0));
/// ```
pub fn parse_page(html: &str, page_url: &Url, profile: &SiteProfile) -> ParsedPage {
    let document = Html::parse_document(html);

    let cards: Vec<ElementRef<'_>> = profile
        .card_selectors
        .iter()
        .map(|selector| document.select(selector).collect::<Vec<_>>())
        .find(|cards| !cards.is_empty())
        .unwrap_or_default();

    let no_results = cards.is_empty()
        && profile
            .no_results_markers
            .iter()
            .any(|marker| document.select(marker).next().is_some());

    let drafts: Vec<ListingDraft> = cards
        .iter()
        .map(|card| extract_listing(*card, &profile.fields, page_url))
        .collect();

    ParsedPage {
        fragment_count: cards.len(),
        drafts,
        no_results,
    }
}

/// Applies every field rule to a single listing card
pub fn extract_listing(card: ElementRef<'_>, fields: &FieldRules, page_url: &Url) -> ListingDraft {
    let (latitude, longitude) = match &fields.coordinates {
        Coordinates::Combined(rules) => parse_lat_lng(extract(card, rules).as_deref()),
        Coordinates::Split {
            latitude,
            longitude,
        } => (
            parse_coordinate(extract(card, latitude).as_deref()),
            parse_coordinate(extract(card, longitude).as_deref()),
        ),
    };

    ListingDraft {
        url: fields.url.extract_url(card, page_url),
        address: clean_address(extract(card, &fields.address).as_deref()),
        monthly_price: clean_price(extract(card, &fields.price).as_deref()),
        property_type: extract(card, &fields.property_type),
        size_sqm: extract_size(extract(card, &fields.size).as_deref()),
        latitude,
        longitude,
        available_from: extract(card, &fields.available_from),
    }
}
