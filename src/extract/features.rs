//! Text-pattern extraction for cards that render features as free text
//!
//! e.g. "3 quartos · 2 banheiros · 1 vaga · 80 m²"

use crate::portal::FeaturePattern;
use regex::Regex;
use std::sync::LazyLock;

static RE_ROOMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*quarto").unwrap());
static RE_BATHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*banheiro").unwrap());
static RE_PARKING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*vaga").unwrap());
static RE_AREA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)*)\s*m(?:²|2)").unwrap());
static RE_BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:[.,]\d+)*)\s*$").unwrap());
static RE_GROUPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{3})+(?:,\d+)?$").unwrap());

fn pattern(kind: FeaturePattern) -> &'static Regex {
    match kind {
        FeaturePattern::Rooms => &RE_ROOMS,
        FeaturePattern::Baths => &RE_BATHS,
        FeaturePattern::Parking => &RE_PARKING,
        FeaturePattern::Area => &RE_AREA,
    }
}

/// Returns the first capture of the feature's pattern in `text`
///
/// Case-insensitive; the first match wins.
pub fn capture(kind: FeaturePattern, text: &str) -> Option<&str> {
    pattern(kind)
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parses a count (rooms, baths, parking) from a field value
///
/// Accepts either text carrying the feature word ("3 quartos") or a bare
/// number ("3").
pub fn parse_count(kind: FeaturePattern, text: &str) -> Option<u32> {
    capture(kind, text)
        .or_else(|| bare_number(text))
        .and_then(|digits| digits.parse().ok())
}

/// Parses an area in square meters
///
/// `,` is the decimal separator and a `.` followed by three digits groups
/// thousands ("1.200,5 m²" is 1200.5). A lone `.` with other digit counts is
/// read as a decimal point ("100.5m²").
pub fn parse_area(text: &str) -> Option<f64> {
    capture(FeaturePattern::Area, text)
        .or_else(|| bare_number(text))
        .and_then(parse_decimal)
}

fn parse_decimal(number: &str) -> Option<f64> {
    let plain = if RE_GROUPED.is_match(number) {
        number.replace('.', "").replace(',', ".")
    } else if number.matches(['.', ',']).count() > 1 {
        return None;
    } else {
        number.replace(',', ".")
    };
    plain.parse().ok()
}

fn bare_number(text: &str) -> Option<&str> {
    RE_BARE_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
