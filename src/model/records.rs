use crate::model::{CrawlRequest, FailureKind, Portal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One extracted property listing
///
/// Only `portal` and `url` are guaranteed; every other field degrades to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub portal: Portal,
    pub title: Option<String>,
    /// Raw cleaned price text, e.g. "R$ 450.000"
    pub price: Option<String>,
    pub address: Option<String>,
    /// Usable area in square meters
    pub area: Option<f64>,
    pub rooms: Option<u32>,
    pub baths: Option<u32>,
    pub parking: Option<u32>,
    /// Absolute detail URL
    pub url: String,
    pub neighborhood: Option<String>,
    pub page: u32,
    pub extracted_at: DateTime<Utc>,
}

/// One request that ended without a usable result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
    pub page: u32,
    pub retry_count: u32,
    pub portal: Portal,
    /// Neighborhood name or seed URL of the origin
    pub origin: String,
    pub failed_at: DateTime<Utc>,
}

impl FailureRecord {
    /// Builds a failure record for the given request
    pub fn for_request(request: &CrawlRequest, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            url: request.url.to_string(),
            kind,
            message: message.into(),
            page: request.page,
            retry_count: request.retry_count,
            portal: request.origin.portal,
            origin: request.origin.label(),
            failed_at: Utc::now(),
        }
    }
}
