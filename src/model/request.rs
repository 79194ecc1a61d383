use crate::model::SearchOrigin;
use crate::url::normalize_url;
use crate::UrlResult;
use std::sync::Arc;
use url::Url;

/// A queued unit of work: one result page of one origin
///
/// Requests are never mutated; a retry or a continuation is a new instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    /// The URL to render
    pub url: Url,

    /// The search this page belongs to
    pub origin: Arc<SearchOrigin>,

    /// Page number within the origin (1-based)
    pub page: u32,

    /// Number of failed attempts before this one
    pub retry_count: u32,

    /// Dedup key: the normalized URL
    identity: String,
}

impl CrawlRequest {
    /// Creates the first-page request of an origin
    pub fn seed(url: Url, origin: Arc<SearchOrigin>) -> UrlResult<Self> {
        Self::at_page(url, origin, 1)
    }

    /// Creates a request for an arbitrary page number
    pub fn at_page(url: Url, origin: Arc<SearchOrigin>, page: u32) -> UrlResult<Self> {
        let identity = normalize_url(url.as_str())?.to_string();
        Ok(Self {
            url,
            origin,
            page,
            retry_count: 0,
            identity,
        })
    }

    /// Creates the request for the next page of the same origin
    pub fn continuation(&self, url: Url) -> UrlResult<Self> {
        Self::at_page(url, Arc::clone(&self.origin), self.page + 1)
    }

    /// Creates a new attempt of this request with the retry count incremented
    pub fn retry(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }

    /// The identity key used for dedup
    pub fn identity(&self) -> &str {
        &self.identity
    }
}
