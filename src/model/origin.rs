use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Supported listing portals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    ZapImoveis,
    VivaReal,
}

impl Portal {
    /// Stable identifier used in config files and output records
    pub fn id(&self) -> &'static str {
        match self {
            Self::ZapImoveis => "zapimoveis",
            Self::VivaReal => "vivareal",
        }
    }

    /// Returns all supported portals
    pub fn all() -> [Portal; 2] {
        [Self::ZapImoveis, Self::VivaReal]
    }
}

impl FromStr for Portal {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zapimoveis" | "zap" => Ok(Self::ZapImoveis),
            "vivareal" | "viva-real" => Ok(Self::VivaReal),
            _ => Err(UrlError::UnsupportedPortal(s.to_string())),
        }
    }
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Sale or rent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionType {
    #[default]
    #[serde(rename = "sale", alias = "venda")]
    Sale,
    #[serde(rename = "rent", alias = "aluguel")]
    Rent,
}

impl TransactionType {
    /// Path segment both portals use for the transaction
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Sale => "venda",
            Self::Rent => "aluguel",
        }
    }

    /// Value of the `transacao` query parameter
    pub fn query_value(&self) -> &'static str {
        match self {
            Self::Sale => "venda",
            Self::Rent => "aluguel",
        }
    }
}

/// A multi-value count filter such as rooms "1,2,3,4"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CountSetRepr")]
pub struct CountSet(Vec<u32>);

#[derive(Deserialize)]
#[serde(untagged)]
enum CountSetRepr {
    Text(String),
    List(Vec<u32>),
}

impl TryFrom<CountSetRepr> for CountSet {
    type Error = String;

    fn try_from(repr: CountSetRepr) -> Result<Self, Self::Error> {
        match repr {
            CountSetRepr::Text(text) => text.parse(),
            CountSetRepr::List(values) => Ok(Self::new(values)),
        }
    }
}

impl CountSet {
    /// Creates a count set, sorting and removing duplicates
    pub fn new(mut values: Vec<u32>) -> Self {
        values.sort_unstable();
        values.dedup();
        Self(values)
    }

    pub fn values(&self) -> &[u32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form used in query parameters
    pub fn as_param(&self) -> String {
        self.0
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for CountSet {
    fn default() -> Self {
        Self(vec![1, 2, 3, 4])
    }
}

impl FromStr for CountSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| format!("invalid count '{}' in '{}'", part, s))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(values))
    }
}

/// Filter set applied to a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchFilters {
    pub price_min: u64,
    pub price_max: u64,
    pub area_min: u32,
    pub area_max: u32,
    pub rooms: CountSet,
    pub baths: CountSet,
    pub parking: CountSet,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            price_min: 100_000,
            price_max: 700_000,
            area_min: 20,
            area_max: 150,
            rooms: CountSet::default(),
            baths: CountSet::default(),
            parking: CountSet::default(),
        }
    }
}

/// City-level location every neighborhood search is anchored to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchArea {
    pub state: String,
    pub state_abbr: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for SearchArea {
    fn default() -> Self {
        Self {
            state: "Minas Gerais".to_string(),
            state_abbr: "mg".to_string(),
            city: "Belo Horizonte".to_string(),
            latitude: -19.9167,
            longitude: -43.9345,
        }
    }
}

/// What a search origin starts from
#[derive(Debug, Clone, PartialEq)]
pub enum OriginSource {
    /// A neighborhood name turned into a search URL by the builder
    Neighborhood(String),
    /// A raw search URL supplied by the operator
    SeedUrl(Url),
}

/// One traversal root. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOrigin {
    pub portal: Portal,
    pub source: OriginSource,
    pub transaction: TransactionType,
    pub property_type: String,
    pub area: SearchArea,
    pub filters: SearchFilters,
}

impl SearchOrigin {
    /// Creates a neighborhood origin with default filters and location
    pub fn neighborhood(portal: Portal, name: &str) -> Self {
        Self {
            portal,
            source: OriginSource::Neighborhood(name.to_string()),
            transaction: TransactionType::default(),
            property_type: "apartamento".to_string(),
            area: SearchArea::default(),
            filters: SearchFilters::default(),
        }
    }

    /// Creates an origin from a raw seed URL
    pub fn seed_url(portal: Portal, url: Url) -> Self {
        Self {
            portal,
            source: OriginSource::SeedUrl(url),
            transaction: TransactionType::default(),
            property_type: "apartamento".to_string(),
            area: SearchArea::default(),
            filters: SearchFilters::default(),
        }
    }

    /// Neighborhood name, if this origin was built from one
    pub fn neighborhood_name(&self) -> Option<&str> {
        match &self.source {
            OriginSource::Neighborhood(name) => Some(name),
            OriginSource::SeedUrl(_) => None,
        }
    }

    /// Human-readable label used in logs and failure records
    pub fn label(&self) -> String {
        match &self.source {
            OriginSource::Neighborhood(name) => name.clone(),
            OriginSource::SeedUrl(url) => url.to_string(),
        }
    }
}
