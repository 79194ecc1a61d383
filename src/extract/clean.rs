/// Characters that render as nothing but break equality and matching
const INVISIBLE: &[char] = &[
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // byte order mark
    '\u{00AD}', // soft hyphen
];

/// Placeholder strings some card templates render for missing values
const PLACEHOLDERS: &[&str] = &["null", "undefined"];

/// Cleans a text field scraped from a card
///
/// Strips invisible characters, collapses whitespace runs (including
/// non-breaking spaces) to a single space, and trims. Returns `None` when
/// nothing meaningful is left.
///
/// Idempotent: cleaning an already clean value returns it unchanged.
pub fn clean_text(raw: &str) -> Option<String> {
    let mut cleaned = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars().filter(|c| !INVISIBLE.contains(c)) {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !cleaned.is_empty() {
            cleaned.push(' ');
        }
        pending_space = false;
        cleaned.push(c);
    }

    if cleaned.is_empty() || PLACEHOLDERS.iter().any(|p| cleaned.eq_ignore_ascii_case(p)) {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(
            clean_text("  R$\n   450.000 \t ").as_deref(),
            Some("R$ 450.000")
        );
    }

    #[test]
    fn test_non_breaking_space() {
        assert_eq!(clean_text("R$\u{00A0}450.000").as_deref(), Some("R$ 450.000"));
    }

    #[test]
    fn test_strips_invisible_characters() {
        assert_eq!(
            clean_text("\u{FEFF}Rua\u{200B} da Bahia").as_deref(),
            Some("Rua da Bahia")
        );
    }

    #[test]
    fn test_empty_becomes_none() {
        assert_eq!(clean_text(""), None);
        assert_eq!(clean_text(" \n\t "), None);
        assert_eq!(clean_text("\u{200B}"), None);
    }

    #[test]
    fn test_placeholder_becomes_none() {
        assert_eq!(clean_text("null"), None);
        assert_eq!(clean_text(" undefined "), None);
        assert_eq!(clean_text("nullable").as_deref(), Some("nullable"));
    }

    #[test]
    fn test_idempotent() {
        for raw in ["  a  b ", "\u{200D}x\u{00A0}\u{00A0}y", "Apartamento com 3 Quartos", " "] {
            let once = clean_text(raw);
            let twice = once.as_deref().and_then(clean_text);
            assert_eq!(once, twice);
        }
    }
}
