//! Marketing-term cleaning for scanned item labels.
//!
//! Receipt lines carry eco-label and brand decoration ("BIO-", "GO BIO",
//! "organic") that says nothing about what the item is. Those terms are
//! stripped before any vocabulary matching.

use std::sync::LazyLock;

use regex::Regex;

/// Decoration patterns, applied in order. Each replaces its first match with
/// a single space. Later patterns can match artifacts left by earlier ones,
/// so the order is significant.
const MARKETING_PATTERNS: &[&str] = &[
    // Prefixes
    r"(?i)^bio[-\s]*",
    r"(?i)^go\s+bio\s*",
    r"(?i)^organic\s*",
    r"(?i)^eco\s*",
    r"(?i)^fair\s+trade\s*",
    // Suffixes
    r"(?i)\s+go\s+bio$",
    r"(?i)\s+bio$",
    r"(?i)\s+organic$",
    r"(?i)\s+eco$",
    // Standalone terms mid-string
    r"(?i)\s+bio\s+",
    r"(?i)\s+go\s+",
    r"(?i)\s+organic\s+",
];

static MARKETING_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    MARKETING_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern).expect("marketing pattern is a valid regex"))
        .collect()
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"));

/// Strip marketing decoration from a raw scanned label.
///
/// Never fails. A label consisting only of decoration cleans to `""`.
/// Case is preserved; callers lower-case as needed.
pub fn clean(raw: &str) -> String {
    let mut cleaned = raw.trim().to_string();

    for regex in MARKETING_REGEXES.iter() {
        cleaned = regex.replace(&cleaned, " ").into_owned();
    }

    let cleaned = WHITESPACE_RUN.replace_all(&cleaned, " ").trim().to_string();

    tracing::trace!(raw = raw, cleaned = %cleaned, "Cleaned marketing terms");

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_labels() {
        assert_eq!(clean("BIO-GURKEN GO BIO"), "GURKEN");
        assert_eq!(clean("GO BIO TOMATEN"), "TOMATEN");
        assert_eq!(clean("BIO CLEMENTINEN"), "CLEMENTINEN");
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(clean("Organic tomato juice"), "tomato juice");
        assert_eq!(clean("eco milk"), "milk");
        assert_eq!(clean("Fair Trade Bananas"), "Bananas");
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(clean("Karotten bio"), "Karotten");
        assert_eq!(clean("spinach ORGANIC"), "spinach");
        assert_eq!(clean("Eier eco"), "Eier");
    }

    #[test]
    fn test_mid_string_terms() {
        assert_eq!(clean("Tomaten bio Rispe"), "Tomaten Rispe");
        assert_eq!(clean("milk organic whole"), "milk whole");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(clean("  red   onion  "), "red onion");
    }

    #[test]
    fn test_all_decoration_is_empty() {
        assert_eq!(clean("BIO"), "");
        assert_eq!(clean("organic"), "");
        assert_eq!(clean("   "), "");
        assert_eq!(clean(""), "");
    }

    #[test]
    fn test_plain_names_untouched() {
        assert_eq!(clean("tomato"), "tomato");
        assert_eq!(clean("Butter"), "Butter");
    }
}
