//! Normalization of raw field text into typed values

use thiserror::Error;

/// Square feet to square meters
const SQ_FT_TO_SQ_M: f64 = 0.092903;

/// Markers identifying a size quoted in square feet
const SQ_FT_MARKERS: [&str; 5] = ["sq ft", "sq. ft", "sqft", "square feet", "ft²"];

/// Why a field could not be normalized
///
/// These never leave the extract module; the field becomes `None` instead.
#[derive(Debug, Error, PartialEq)]
pub enum FieldParseError {
    #[error("no numeric value in '{0}'")]
    NoNumber(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Returns the leading numeric token (digits with at most one decimal point)
fn leading_number(text: &str) -> Result<f64, FieldParseError> {
    let token: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if token.is_empty() {
        return Err(FieldParseError::NoNumber(text.to_string()));
    }

    token
        .parse::<f64>()
        .map_err(|_| FieldParseError::InvalidNumber(token))
}

/// Returns the first numeric token anywhere in the text
fn first_number(text: &str) -> Result<f64, FieldParseError> {
    let start = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| FieldParseError::NoNumber(text.to_string()))?;
    leading_number(&text[start..])
}

fn parse_price(text: &str) -> Result<f64, FieldParseError> {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ','))
        .collect();
    leading_number(&stripped)
}

fn parse_size(text: &str) -> Result<f64, FieldParseError> {
    let magnitude = first_number(&text.replace(',', ""))?;
    let lowered = text.to_lowercase();

    if SQ_FT_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        Ok((magnitude * SQ_FT_TO_SQ_M * 100.0).round() / 100.0)
    } else {
        Ok(magnitude)
    }
}

/// Converts price text such as "£1,250 pcm" into a monthly amount
///
/// Currency symbols and thousands separators are dropped and the leading
/// number is parsed. Absent or malformed input yields `None`.
///
/// # Example
///
/// ```
/// use rent_sweep::extract::clean_price;
///
/// assert_eq!(clean_price(Some("£1,250 pcm")), Some(1250.0));
/// assert_eq!(clean_price(None), None);
/// ```
pub fn clean_price(raw: Option<&str>) -> Option<f64> {
    let text = raw?;
    match parse_price(text) {
        Ok(price) => Some(price),
        Err(e) => {
            tracing::debug!("Dropping price field: {}", e);
            None
        }
    }
}

/// Trims an address and collapses internal whitespace; blank input yields `None`
pub fn clean_address(raw: Option<&str>) -> Option<String> {
    let collapsed = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Converts size text into square meters
///
/// Sizes marked as square feet are converted and rounded to two decimals;
/// anything else is taken as square meters already.
pub fn extract_size(raw: Option<&str>) -> Option<f64> {
    let text = raw?;
    match parse_size(text) {
        Ok(size) => Some(size),
        Err(e) => {
            tracing::debug!("Dropping size field: {}", e);
            None
        }
    }
}

/// Parses a single coordinate, defaulting to 0.0
pub fn parse_coordinate(raw: Option<&str>) -> f64 {
    raw.and_then(|text| text.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Parses a combined "lat,lng" attribute, defaulting each half to 0.0
pub fn parse_lat_lng(raw: Option<&str>) -> (f64, f64) {
    match raw.and_then(|text| text.split_once(',')) {
        Some((lat, lng)) => (parse_coordinate(Some(lat)), parse_coordinate(Some(lng))),
        None => (0.0, 0.0),
    }
}
