use crate::model::{Portal, SearchOrigin};
use crate::UrlResult;
use url::Url;

/// Renders a neighborhood origin into a portal's search URL
pub type UrlShape = fn(base_origin: &str, origin: &SearchOrigin, neighborhood: &str) -> UrlResult<Url>;

/// A listing field extracted from each card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Price,
    Address,
    Area,
    Rooms,
    Baths,
    Parking,
    DetailUrl,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Price => "price",
            Self::Address => "address",
            Self::Area => "area",
            Self::Rooms => "rooms",
            Self::Baths => "baths",
            Self::Parking => "parking",
            Self::DetailUrl => "url",
        }
    }

    /// Returns all fields in record order
    pub fn all() -> [Field; 8] {
        [
            Self::Title,
            Self::Price,
            Self::Address,
            Self::Area,
            Self::Rooms,
            Self::Baths,
            Self::Parking,
            Self::DetailUrl,
        ]
    }
}

/// Which regular expression a [`Locator::Pattern`] runs over a card's feature text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeaturePattern {
    Rooms,
    Baths,
    Parking,
    Area,
}

/// One extraction strategy in a field's fallback chain
///
/// Selectors are matched against the card's descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Text of the first matching element with non-empty text
    Text(&'static str),

    /// Attribute of the first matching element that carries it
    Attr(&'static str, &'static str),

    /// Text of the first matching element whose text contains the needle
    TextContaining(&'static str, &'static str),

    /// Attribute of the card element itself
    OwnAttr(&'static str),

    /// Regex capture over the card's concatenated feature text
    Pattern(FeaturePattern),
}

/// Ordered fallback chain for one field
#[derive(Debug, Clone, Copy)]
pub struct FieldChain {
    pub field: Field,
    pub locators: &'static [Locator],
}

/// How a portal exposes the next result page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationAffordance {
    /// Continue by setting the page query parameter
    UrlParameter,

    /// Look for an explicit "next page" control first
    NextControl { selectors: &'static [&'static str] },
}

/// Everything the crawler needs to know about one portal
#[derive(Debug)]
pub struct PortalProfile {
    pub portal: Portal,

    /// Scheme and host that relative listing links resolve against
    pub base_origin: &'static str,

    pub url_shape: UrlShape,

    /// Card container selectors, tried in order; the first with matches wins
    pub container_selectors: &'static [&'static str],

    /// Text a container must contain to count as a listing card
    pub container_marker: Option<&'static str>,

    /// Selector a browser renderer waits for before scrolling
    pub ready_selector: &'static str,

    /// Elements whose text is concatenated for [`Locator::Pattern`]
    pub feature_selectors: &'static [&'static str],

    pub fields: &'static [FieldChain],

    /// Number of cards on a full result page
    pub page_size: u32,

    /// Query parameter carrying the page number
    pub page_param: &'static str,

    pub pagination: PaginationAffordance,

    /// Lowercase substrings that indicate an anti-bot or access-denied page
    pub block_markers: &'static [&'static str],
}

impl PortalProfile {
    /// Fallback chain for a field; empty if the portal has none
    pub fn chain(&self, field: Field) -> &'static [Locator] {
        self.fields
            .iter()
            .find(|chain| chain.field == field)
            .map(|chain| chain.locators)
            .unwrap_or(&[])
    }
}
