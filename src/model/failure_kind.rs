//! Failure taxonomy for page-level outcomes
//!
//! Every request that ends without records is reported with one of these kinds.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a crawl failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    // ===== Extraction =====
    /// The container selector matched nothing on the page
    StructuralMiss,

    /// One field's fallback chain was exhausted (resolved to null, never fatal)
    FieldExtractionMiss,

    // ===== Retryable =====
    /// Navigation did not finish within the navigation timeout
    NavigationTimeout,

    /// The document did not become ready within the content-wait timeout
    ContentWaitTimeout,

    /// Transient navigation failure (connection reset, 5xx, browser hiccup)
    NavigationError,

    /// Page looked like an anti-bot or access-denied response
    BlockedOrDenied,

    // ===== Terminal =====
    /// Permanent HTTP failure such as 404
    HttpError,

    /// Portal identifier is not in the capability table
    UnsupportedPortal,

    /// Retry budget consumed
    RequestExhausted,
}

impl FailureKind {
    /// Returns true if a request failing with this kind may be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout
                | Self::ContentWaitTimeout
                | Self::NavigationError
                | Self::BlockedOrDenied
        )
    }

    /// Returns true if a fresh identity (proxy session) is recommended before retrying
    pub fn wants_identity_rotation(&self) -> bool {
        matches!(self, Self::BlockedOrDenied)
    }

    /// Converts the kind to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::StructuralMiss => "structural_miss",
            Self::FieldExtractionMiss => "field_extraction_miss",
            Self::NavigationTimeout => "navigation_timeout",
            Self::ContentWaitTimeout => "content_wait_timeout",
            Self::NavigationError => "navigation_error",
            Self::BlockedOrDenied => "blocked_or_denied",
            Self::HttpError => "http_error",
            Self::UnsupportedPortal => "unsupported_portal",
            Self::RequestExhausted => "request_exhausted",
        }
    }

    /// Parses a kind from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "structural_miss" => Some(Self::StructuralMiss),
            "field_extraction_miss" => Some(Self::FieldExtractionMiss),
            "navigation_timeout" => Some(Self::NavigationTimeout),
            "content_wait_timeout" => Some(Self::ContentWaitTimeout),
            "navigation_error" => Some(Self::NavigationError),
            "blocked_or_denied" => Some(Self::BlockedOrDenied),
            "http_error" => Some(Self::HttpError),
            "unsupported_portal" => Some(Self::UnsupportedPortal),
            "request_exhausted" => Some(Self::RequestExhausted),
            _ => None,
        }
    }

    /// Returns all failure kinds
    pub fn all_kinds() -> Vec<Self> {
        vec![
            Self::StructuralMiss,
            Self::FieldExtractionMiss,
            Self::NavigationTimeout,
            Self::ContentWaitTimeout,
            Self::NavigationError,
            Self::BlockedOrDenied,
            Self::HttpError,
            Self::UnsupportedPortal,
            Self::RequestExhausted,
        ]
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
