use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Turns a place name into a URL-safe slug
///
/// Diacritics are stripped (NFD decomposition, combining marks dropped), the
/// result is lowercased, and every run of whitespace, `-` or `_` becomes a
/// single hyphen. Any other punctuation is dropped.
///
/// # Examples
///
/// ```
/// use listing_crawl::url::slugify;
///
/// assert_eq!(slugify("Santa Helena"), "santa-helena");
/// assert_eq!(slugify("  São  Bento "), "sao-bento");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = true;
        }
    }

    slug
}
