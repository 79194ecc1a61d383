//! Failure classification
//!
//! Maps renderer errors and suspicious pages onto [`FailureKind`].

use crate::crawler::renderer::{RenderError, RenderedPage};
use crate::model::FailureKind;
use crate::portal::PortalProfile;

/// Maps a render error to its failure kind
///
/// # Arguments
///
/// * `error` - The error returned by the renderer
///
/// # Returns
///
/// * `BlockedOrDenied` for 403 and 429
/// * `NavigationError` for 408, 5xx and transport or browser failures
/// * `HttpError` for any other 4xx
/// * The matching timeout kind for timeouts
pub fn classify(error: &RenderError) -> FailureKind {
    match error {
        RenderError::NavigationTimeout(_) => FailureKind::NavigationTimeout,
        RenderError::ContentWaitTimeout(_) => FailureKind::ContentWaitTimeout,
        RenderError::HttpStatus(status) => classify_status(*status),
        RenderError::Navigation(_) | RenderError::Browser(_) | RenderError::Setup(_) => {
            FailureKind::NavigationError
        }
    }
}

fn classify_status(status: u16) -> FailureKind {
    match status {
        403 | 429 => FailureKind::BlockedOrDenied,
        408 | 500..=599 => FailureKind::NavigationError,
        _ => FailureKind::HttpError,
    }
}

/// Checks a successfully rendered page for signs of an anti-bot response
///
/// A page counts as blocked when its body is shorter than `min_content_length`,
/// or when it has no listing containers and contains one of the portal's
/// block markers. Pages that rendered cards are never flagged.
///
/// # Returns
///
/// * `Some(reason)` - The page looks blocked
/// * `None` - The page looks genuine
pub fn detect_block(
    page: &RenderedPage,
    profile: &PortalProfile,
    container_count: usize,
    min_content_length: usize,
) -> Option<String> {
    if let Some(status) = page.status {
        if classify_status(status) == FailureKind::BlockedOrDenied {
            return Some(format!("HTTP {}", status));
        }
    }

    if page.html.len() < min_content_length {
        return Some(format!(
            "Body of {} bytes is shorter than {}",
            page.html.len(),
            min_content_length
        ));
    }

    if container_count > 0 {
        return None;
    }

    let lowered = page.html.to_lowercase();
    profile
        .block_markers
        .iter()
        .find(|marker| lowered.contains(*marker))
        .map(|marker| format!("Block marker '{}' without listings", marker))
}
