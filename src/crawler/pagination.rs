//! Pagination policy: whether and how an origin continues to its next page

use crate::extract::NextControl;
use crate::model::CrawlRequest;
use crate::portal::{PaginationAffordance, PortalProfile};
use crate::url::with_page;
use crate::UrlResult;
use std::fmt;

/// Why an origin stops paginating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The per-origin page cap was reached
    PageCap,
    /// The page produced no records
    EmptyPage,
    /// Fewer records than a full page
    ShortPage,
    /// The portal's next-page control is disabled
    LastPage,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PageCap => "page cap reached",
            Self::EmptyPage => "empty page",
            Self::ShortPage => "short page",
            Self::LastPage => "next-page control disabled",
        };
        write!(f, "{}", text)
    }
}

/// Outcome of [`PaginationPolicy::next`]
#[derive(Debug, Clone, PartialEq)]
pub enum PaginationDecision {
    Continue(CrawlRequest),
    Stop(StopReason),
}

/// Decides continuation for one portal
#[derive(Debug, Clone)]
pub struct PaginationPolicy {
    max_pages: u32,
    page_size: u32,
    page_param: &'static str,
    affordance: PaginationAffordance,
}

impl PaginationPolicy {
    /// Creates the policy for a portal
    ///
    /// # Arguments
    ///
    /// * `profile` - The portal's capability profile
    /// * `max_pages` - Page cap per origin
    /// * `expected_page_size` - Overrides the portal's full-page size when set
    pub fn new(profile: &PortalProfile, max_pages: u32, expected_page_size: Option<u32>) -> Self {
        Self {
            max_pages,
            page_size: expected_page_size.unwrap_or(profile.page_size),
            page_param: profile.page_param,
            affordance: profile.pagination,
        }
    }

    /// Records that make a page "full"
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Decides whether `request`'s origin continues past this page
    ///
    /// In priority order:
    /// 1. At the page cap, stop.
    /// 2. With zero records, stop.
    /// 3. On portals with a next-page control: a disabled control stops, an
    ///    enabled link is followed, an enabled button continues by page
    ///    parameter. Without a control, fall through.
    /// 4. A page whose container selector matched a full page of cards
    ///    continues by page parameter; a short page stops. Cards skipped for
    ///    lack of a link still count toward a full page.
    ///
    /// The continuation always carries page number + 1.
    pub fn next(
        &self,
        request: &CrawlRequest,
        extracted: usize,
        cards: usize,
        control: &NextControl,
    ) -> UrlResult<PaginationDecision> {
        if request.page >= self.max_pages {
            return Ok(PaginationDecision::Stop(StopReason::PageCap));
        }

        if extracted == 0 {
            return Ok(PaginationDecision::Stop(StopReason::EmptyPage));
        }

        if let PaginationAffordance::NextControl { .. } = self.affordance {
            match control {
                NextControl::Disabled => return Ok(PaginationDecision::Stop(StopReason::LastPage)),
                NextControl::Enabled { href: Some(href) } => {
                    if let Ok(url) = request.url.join(href) {
                        return Ok(PaginationDecision::Continue(request.continuation(url)?));
                    }
                    tracing::debug!("Unusable next-page link '{}' on {}", href, request.url);
                    return self.continue_by_parameter(request);
                }
                NextControl::Enabled { href: None } => return self.continue_by_parameter(request),
                NextControl::Absent => {}
            }
        }

        if cards as u64 >= u64::from(self.page_size) {
            self.continue_by_parameter(request)
        } else {
            Ok(PaginationDecision::Stop(StopReason::ShortPage))
        }
    }

    fn continue_by_parameter(&self, request: &CrawlRequest) -> UrlResult<PaginationDecision> {
        let url = with_page(&request.url, self.page_param, request.page + 1);
        Ok(PaginationDecision::Continue(request.continuation(url)?))
    }
}
