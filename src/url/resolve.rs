/// Resolves a listing's detail link against the portal's base origin
///
/// Absolute `http(s)` links are returned unchanged. Protocol-relative links get
/// an `https:` scheme. Anything else is appended to `base_origin`, with a
/// separating slash inserted only when the link lacks one.
///
/// Returns `None` for empty links and links that do not point at a page
/// (`#...`, `javascript:`, `mailto:`, `tel:`).
///
/// # Examples
///
/// ```
/// use listing_crawl::url::resolve_detail_url;
///
/// assert_eq!(
///     resolve_detail_url("/imovel/123", "https://www.zapimoveis.com.br").as_deref(),
///     Some("https://www.zapimoveis.com.br/imovel/123")
/// );
/// ```
pub fn resolve_detail_url(href: &str, base_origin: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(href.to_string());
    }

    if href.starts_with("//") {
        return Some(format!("https:{}", href));
    }

    let base = base_origin.trim_end_matches('/');
    if href.starts_with('/') {
        Some(format!("{}{}", base, href))
    } else {
        Some(format!("{}/{}", base, href))
    }
}
