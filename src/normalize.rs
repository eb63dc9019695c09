//! Shared normalization functions for track matching.
//! Used by the variant generator, the planner, the scorer and the catalog.
//!
//! CRITICAL: Any change here shifts every similarity score. Run tests after changes.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Straight, curly and backtick quote characters.
pub static QUOTE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\u{2018}\u{2019}'"`]+"#).unwrap());

/// Anything left after folding that is not a lowercase letter, digit or whitespace.
pub static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

/// Separators inside a combined artist credit.
/// Matches: ;  ,  feat / feat.  ft / ft.  with  &
pub static ARTIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i);|,|\s+feat\.?\s+|\s+ft\.?\s+|\s+with\s+|\s*&\s*").unwrap()
});

/// Regex to collapse runs of whitespace into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
/// Used to filter out accents during folding.
pub fn is_combining_mark(c: char) -> bool {
    matches!(
        c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
    )
}

/// Fold Unicode text to ASCII by applying NFKD decomposition and removing combining marks.
/// Case is preserved so the result can also serve as a search variant.
/// e.g., "Beyoncé" → "Beyonce", "Motörhead" → "Motorhead", "Don’t" → "Don't"
pub fn fold_to_ascii(s: &str) -> String {
    if s.is_ascii() {
        return s.to_string();
    }
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    // Transliterate whatever is still non-ASCII (Cyrillic, CJK, typographic quotes, ...)
    any_ascii(&stripped)
}

/// Collapse whitespace runs to a single space and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    MULTI_SPACE.replace_all(s, " ").trim().to_string()
}

/// Deduplicate strings by exact equality, keeping first-seen order and dropping empties.
pub fn dedupe_ordered<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: FxHashSet<String> = FxHashSet::default();
    items
        .into_iter()
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize text into the canonical form used for every similarity comparison.
///
/// Steps: ASCII-fold, lower-case, `&` → ` and `, strip quotes, turn remaining
/// punctuation into spaces, collapse whitespace. Output only contains `[a-z0-9 ]`,
/// which makes the function idempotent.
pub fn normalize_text(text: &str) -> String {
    let folded = fold_to_ascii(text).to_lowercase();
    let joined = folded.replace('&', " and ");
    let unquoted = QUOTE_CHARS.replace_all(&joined, "");
    let spaced = NON_ALNUM.replace_all(&unquoted, " ");
    collapse_whitespace(&spaced)
}

/// Normalize optional text; absent values normalize to the empty string.
pub fn normalize_optional(text: Option<&str>) -> String {
    text.map(normalize_text).unwrap_or_default()
}

/// Split a combined artist credit into normalized, deduplicated artist tokens.
/// e.g., "Daft Punk feat. Pharrell Williams & Nile Rodgers"
///       → ["daft punk", "pharrell williams", "nile rodgers"]
pub fn split_artists(credit: &str) -> Vec<String> {
    if credit.trim().is_empty() {
        return Vec::new();
    }
    let folded = fold_to_ascii(credit);
    dedupe_ordered(ARTIST_SEPARATOR.split(&folded).map(normalize_text))
}

/// Primary (first credited) artist of a credit string.
/// Falls back to the whole normalized credit when splitting yields nothing.
pub fn primary_artist(credit: &str) -> String {
    split_artists(credit)
        .into_iter()
        .next()
        .unwrap_or_else(|| normalize_text(credit))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_basic() {
        assert_eq!(normalize_text("Don't Stop Believin'"), "dont stop believin");
        assert_eq!(normalize_text("Rock & Roll"), "rock and roll");
        assert_eq!(normalize_text("  Hello,   World!  "), "hello world");
        assert_eq!(normalize_text("AC/DC"), "ac dc");
    }

    #[test]
    fn test_normalize_text_unicode() {
        assert_eq!(normalize_text("Beyoncé"), "beyonce");
        assert_eq!(normalize_text("Motörhead"), "motorhead");
        assert_eq!(normalize_text("Don’t Stop"), "dont stop");
        assert_eq!(normalize_text("“Heroes”"), "heroes");
    }

    #[test]
    fn test_normalize_text_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   "), "");
        assert_eq!(normalize_text("!!!"), "");
        assert_eq!(normalize_optional(None), "");
        assert_eq!(normalize_optional(Some("Abbey Road")), "abbey road");
    }

    #[test]
    fn test_normalize_text_idempotent() {
        let samples = [
            "Don't Stop Believin'",
            "Sigur Rós - Hoppípolla (Live)",
            "Simon & Garfunkel",
            "\tTabs\nand  newlines ",
            "Кино",
            "Björk’s “Army of Me”",
            "",
        ];
        for s in samples {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_fold_to_ascii_preserves_case() {
        assert_eq!(fold_to_ascii("Björk"), "Bjork");
        assert_eq!(fold_to_ascii("Beyoncé"), "Beyonce");
        assert_eq!(fold_to_ascii("Don’t"), "Don't");
        assert_eq!(fold_to_ascii("plain"), "plain");
    }

    #[test]
    fn test_split_artists() {
        assert_eq!(
            split_artists("Daft Punk feat. Pharrell Williams & Nile Rodgers"),
            vec!["daft punk", "pharrell williams", "nile rodgers"]
        );
        assert_eq!(split_artists("Mustard, Migos"), vec!["mustard", "migos"]);
        assert_eq!(split_artists("Drake FT Rihanna"), vec!["drake", "rihanna"]);
        assert_eq!(split_artists("A;B;a"), vec!["a", "b"]);
        assert_eq!(split_artists("Run With Me"), vec!["run", "me"]);
        assert!(split_artists("").is_empty());
        assert!(split_artists(" ; , ").is_empty());
    }

    #[test]
    fn test_split_artists_keeps_words_containing_separators() {
        // "feat" and "with" only split as standalone words
        assert_eq!(split_artists("Featherweight"), vec!["featherweight"]);
        assert_eq!(split_artists("Withered Hand"), vec!["withered hand"]);
    }

    #[test]
    fn test_primary_artist() {
        assert_eq!(primary_artist("Journey"), "journey");
        assert_eq!(primary_artist("Simon & Garfunkel"), "simon");
        assert_eq!(primary_artist("Mustard, Migos"), "mustard");
        assert_eq!(primary_artist(""), "");
    }

    #[test]
    fn test_dedupe_ordered() {
        let out = dedupe_ordered(
            ["b", "a", "", "b", "c", "a"].iter().map(|s| s.to_string()),
        );
        assert_eq!(out, vec!["b", "a", "c"]);
    }
}
