//! Ordered fallback rules for pulling a single field out of a fragment

use scraper::{ElementRef, Selector};
use url::Url;

/// One way of locating a field inside a listing fragment
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// Text content of the first descendant matching the selector
    Text(Selector),

    /// Attribute on the fragment root element itself
    OwnAttr(String),

    /// `href` of the first descendant matching the selector
    Href(Selector),
}

impl FieldRule {
    /// Applies this rule to a fragment, returning the trimmed non-empty match
    fn apply(&self, fragment: ElementRef<'_>) -> Option<String> {
        let raw = match self {
            Self::Text(selector) => fragment
                .select(selector)
                .next()
                .map(|element| element.text().collect::<String>()),
            Self::OwnAttr(name) => fragment.value().attr(name).map(str::to_string),
            Self::Href(selector) => fragment
                .select(selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .map(str::to_string),
        }?;

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// An ordered list of candidate rules for one field
///
/// A single-selector field is a list of length one.
#[derive(Debug, Clone, Default)]
pub struct RuleList {
    rules: Vec<FieldRule>,
}

impl RuleList {
    /// Text rules from CSS selectors, in priority order
    ///
    /// Selectors that fail to parse are skipped with a warning.
    pub fn text(selectors: &[&str]) -> Self {
        Self {
            rules: compile_selectors(selectors).into_iter().map(FieldRule::Text).collect(),
        }
    }

    /// Link rules from CSS selectors, in priority order
    pub fn href(selectors: &[&str]) -> Self {
        Self {
            rules: compile_selectors(selectors).into_iter().map(FieldRule::Href).collect(),
        }
    }

    /// Attribute rules read from the fragment root, in priority order
    pub fn own_attr(names: &[&str]) -> Self {
        Self {
            rules: names
                .iter()
                .map(|name| FieldRule::OwnAttr(name.to_string()))
                .collect(),
        }
    }

    /// Number of usable rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when no rule survived compilation
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolves the first matching `href` against the page URL
    pub fn extract_url(&self, fragment: ElementRef<'_>, page_url: &Url) -> Option<String> {
        let href = extract(fragment, self)?;
        match page_url.join(&href) {
            Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
                Some(absolute.to_string())
            }
            _ => {
                tracing::debug!("Discarding unusable listing link '{}'", href);
                None
            }
        }
    }
}

/// Parses CSS selectors, skipping (and logging) any that are invalid
pub(crate) fn compile_selectors(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::warn!("Skipping invalid selector '{}': {:?}", css, e);
                None
            }
        })
        .collect()
}

/// Tries each rule in order and returns the first non-empty match
///
/// # Arguments
///
/// * `fragment` - The listing card element
/// * `rules` - Candidate rules, highest priority first
///
/// # Returns
///
/// The trimmed text of the first rule that matched, or `None`
///
/// # Example
///
/// ```
/// use rent_sweep::extract::{extract, RuleList};
/// use scraper::{Html, Selector};
///
/// let html = Html::parse_fragment(r#"<div class="card"><span class="b">Flat</span></div>"#);
/// let card = html.select(&Selector::parse("div.card").unwrap()).next().unwrap();
/// let rules = RuleList::text(&[".a", ".b"]);
/// assert_eq!(extract(card, &rules), Some("Flat".to_string()));
/// ```
pub fn extract(fragment: ElementRef<'_>, rules: &RuleList) -> Option<String> {
    rules.rules.iter().find_map(|rule| rule.apply(fragment))
}
