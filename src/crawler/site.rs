//! Per-site crawl profiles
//!
//! A profile is everything that differs between sites: the search URL and
//! its fixed parameters, how pagination is expressed, which selectors find
//! listing cards, and the field rules applied to each card. The crawl loop
//! itself is shared.

use crate::config::{Config, OpenRentConfig, RightmoveConfig};
use crate::extract::{compile_selectors, RuleList};
use scraper::Selector;
use std::fmt;

/// Results per Rightmove search page
pub const RIGHTMOVE_PAGE_SIZE: u32 = 24;

/// A supported listing site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    Rightmove,
    OpenRent,
}

impl Site {
    /// Every supported site, in crawl order
    pub const ALL: [Site; 2] = [Site::Rightmove, Site::OpenRent];

    /// Lowercase identifier used on the command line and in file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rightmove => "rightmove",
            Self::OpenRent => "openrent",
        }
    }

    /// Name of the CSV file this site's records are written to
    pub fn output_file_name(&self) -> String {
        format!("{}_data.csv", self.as_str())
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a site addresses successive results pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pagination {
    /// Zero-based result offset, `page_size` results per page
    Offset { param: String, page_size: u32 },

    /// One-based page number
    PageNumber { param: String },
}

impl Pagination {
    /// Query parameter selecting the given 1-based page
    pub fn param_for(&self, page: u32) -> (String, String) {
        match self {
            Self::Offset { param, page_size } => {
                (param.clone(), (page.saturating_sub(1) * page_size).to_string())
            }
            Self::PageNumber { param } => (param.clone(), page.to_string()),
        }
    }
}

/// Where a card keeps its coordinates
#[derive(Debug, Clone)]
pub enum Coordinates {
    /// One `"lat,lng"` attribute
    Combined(RuleList),

    /// Separate latitude and longitude attributes
    Split { latitude: RuleList, longitude: RuleList },
}

/// Field rules applied to every listing card of a site
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub address: RuleList,
    pub price: RuleList,
    pub property_type: RuleList,
    pub size: RuleList,
    pub url: RuleList,
    pub available_from: RuleList,
    pub coordinates: Coordinates,
}

/// Everything the crawler needs to know about one site
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub site: Site,

    /// Search URL without pagination
    pub base_url: String,

    /// Query parameters sent with every page
    pub fixed_params: Vec<(String, String)>,

    pub pagination: Pagination,

    /// Card selectors in priority order; the first one that matches anything wins
    pub card_selectors: Vec<Selector>,

    /// Elements signalling the search has run out of results
    pub no_results_markers: Vec<Selector>,

    pub fields: FieldRules,

    /// Whether a listing without a link is discarded
    pub require_url: bool,
}

impl SiteProfile {
    /// Builds the profile for `site` from its config section
    pub fn for_site(site: Site, config: &Config) -> Self {
        match site {
            Site::Rightmove => Self::rightmove(&config.rightmove),
            Site::OpenRent => Self::openrent(&config.openrent),
        }
    }

    pub fn rightmove(config: &RightmoveConfig) -> Self {
        Self {
            site: Site::Rightmove,
            base_url: config.base_url.clone(),
            fixed_params: vec![
                (
                    "locationIdentifier".to_string(),
                    config.location_identifier.clone(),
                ),
                ("propertyType".to_string(), config.property_type.clone()),
                ("maxPrice".to_string(), config.max_price.to_string()),
            ],
            pagination: Pagination::Offset {
                param: "index".to_string(),
                page_size: RIGHTMOVE_PAGE_SIZE,
            },
            card_selectors: compile_selectors(&["div.propertyCard"]),
            no_results_markers: compile_selectors(&[
                ".no-results",
                "[data-test='no-results']",
                ".searchHeader-noResults",
            ]),
            fields: FieldRules {
                address: RuleList::text(&[
                    "address.propertyCard-address",
                    ".property-address",
                    "[data-test='address']",
                    "[itemprop='address']",
                ]),
                price: RuleList::text(&[
                    "div.propertyCard-priceValue",
                    ".property-price",
                    "[data-test='price']",
                    "[itemprop='price']",
                ]),
                property_type: RuleList::text(&[
                    "h2.propertyCard-title",
                    ".property-type",
                    "[data-test='property-type']",
                ]),
                size: RuleList::text(&[
                    "div.propertyCard-size",
                    ".property-size",
                    "[data-test='size']",
                ]),
                url: RuleList::href(&[
                    "a.propertyCard-link",
                    ".property-link",
                    "[data-test='property-link']",
                ]),
                available_from: RuleList::text(&[
                    "div.propertyCard-available",
                    ".property-available",
                    "[data-test='available-from']",
                ]),
                coordinates: Coordinates::Combined(RuleList::own_attr(&[
                    "data-lat-lng",
                    "data-coordinates",
                ])),
            },
            require_url: true,
        }
    }

    pub fn openrent(config: &OpenRentConfig) -> Self {
        Self {
            site: Site::OpenRent,
            base_url: config.base_url.clone(),
            fixed_params: Vec::new(),
            pagination: Pagination::PageNumber {
                param: "page".to_string(),
            },
            card_selectors: compile_selectors(&["div.property", "[data-listing]", ".listing-item"]),
            no_results_markers: compile_selectors(&[".no-results", "#noResults", ".empty-search"]),
            fields: FieldRules {
                address: RuleList::text(&["div.location", ".listing-address", "[data-address]"]),
                price: RuleList::text(&["div.price strong", ".listing-price", "[data-price]"]),
                property_type: RuleList::text(&[
                    "div.property-type",
                    ".listing-type",
                    "[data-property-type]",
                ]),
                size: RuleList::text(&["div.size", ".listing-size", "[data-size]"]),
                url: RuleList::href(&["h2 a", ".listing-title a", "[data-listing-url]"]),
                available_from: RuleList::text(&[
                    "div.available-date",
                    ".listing-available-date",
                    "[data-available-date]",
                ]),
                coordinates: Coordinates::Split {
                    latitude: RuleList::own_attr(&["data-latitude", "data-lat"]),
                    longitude: RuleList::own_attr(&["data-longitude", "data-lng"]),
                },
            },
            require_url: false,
        }
    }

    /// Full query for the given 1-based page
    pub fn page_params(&self, page: u32) -> Vec<(String, String)> {
        let mut params = self.fixed_params.clone();
        params.push(self.pagination.param_for(page));
        params
    }
}
