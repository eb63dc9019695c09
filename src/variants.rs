//! Alternate spellings of track titles and free-text search input.
//!
//! Catalog searches are literal, so a title typed with a straight apostrophe will
//! not find a track stored with a curly one. Both entry points below expand the
//! input into an ordered, duplicate-free list of spellings built from the same
//! transform primitives:
//! - `build_track_variants`: used by the query planner and the scorer
//! - `build_query_variants`: used by interactive search

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::{collapse_whitespace, dedupe_ordered, fold_to_ascii};

/// Start of a bracketed or dashed suffix: "(Live)", "[Remastered]", " - Acoustic".
pub static SUFFIX_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\(\[]| - ").unwrap());

// ============================================================================
// Transform Primitives
// ============================================================================

/// Cut everything from the first bracket or " - " on.
/// e.g., "Hey Jude (Remastered 2015)" → "Hey Jude"
pub fn strip_suffix(s: &str) -> String {
    let head = match SUFFIX_START.find(s) {
        Some(m) => &s[..m.start()],
        None => s,
    };
    head.trim().to_string()
}

/// Remove straight single and double quotes.
pub fn strip_quotes(s: &str) -> String {
    s.replace(['\'', '"'], "")
}

pub fn straight_to_curly(s: &str) -> String {
    s.replace('\'', "\u{2019}")
}

pub fn curly_to_straight(s: &str) -> String {
    s.replace('\u{2019}', "'")
}

pub fn ampersand_to_and(s: &str) -> String {
    s.replace('&', "and")
}

pub fn and_to_ampersand(s: &str) -> String {
    s.replace(" and ", " & ")
}

// ============================================================================
// Entry Points
// ============================================================================

/// Spellings of a track title, original first.
///
/// Order: original, suffix-stripped, quotes removed, apostrophe swaps, `&`/`and`
/// swaps, then whitespace-collapsed and ASCII-folded copies of everything before.
pub fn build_track_variants(title: &str) -> Vec<String> {
    if title.trim().is_empty() {
        return Vec::new();
    }

    let mut variants = vec![
        title.to_string(),
        strip_suffix(title),
        strip_quotes(title),
        straight_to_curly(title),
        curly_to_straight(title),
        ampersand_to_and(title),
        and_to_ampersand(title),
    ];

    let collapsed: Vec<String> = variants.iter().map(|v| collapse_whitespace(v)).collect();
    variants.extend(collapsed);

    let folded: Vec<String> = variants.iter().map(|v| fold_to_ascii(v)).collect();
    variants.extend(folded);

    dedupe_ordered(variants)
}

/// Spellings of free-text search input, trimmed original first.
///
/// Each step builds on the previous one: fold, drop quotes, `&` → `and`,
/// ` and ` → ` & `, strip suffix, collapse whitespace. Apostrophe swaps are
/// applied to the untouched input.
pub fn build_query_variants(text: &str) -> Vec<String> {
    let base = text.trim();
    if base.is_empty() {
        return Vec::new();
    }

    let folded = fold_to_ascii(base);
    let unquoted = strip_quotes(&folded);
    let spelled_out = ampersand_to_and(&unquoted);
    let abbreviated = and_to_ampersand(&spelled_out);
    let simple = strip_suffix(&abbreviated);
    let collapsed = collapse_whitespace(&simple);

    dedupe_ordered([
        base.to_string(),
        folded,
        straight_to_curly(base),
        curly_to_straight(base),
        unquoted,
        spelled_out,
        abbreviated,
        simple,
        collapsed,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    fn assert_clean(variants: &[String]) {
        let unique: FxHashSet<&String> = variants.iter().collect();
        assert_eq!(unique.len(), variants.len(), "duplicates in {:?}", variants);
        assert!(variants.iter().all(|v| !v.is_empty()), "empty entry in {:?}", variants);
    }

    #[test]
    fn test_strip_suffix() {
        assert_eq!(strip_suffix("Hey Jude (Remastered 2015)"), "Hey Jude");
        assert_eq!(strip_suffix("Song [Live]"), "Song");
        assert_eq!(strip_suffix("Song - Acoustic Version"), "Song");
        assert_eq!(strip_suffix("Song(Live)"), "Song");
        assert_eq!(strip_suffix("Plain Title"), "Plain Title");
        assert_eq!(strip_suffix("(Intro)"), "");
    }

    #[test]
    fn test_track_variants_apostrophes() {
        let variants = build_track_variants("Don't Stop Believin'");
        assert_eq!(
            variants,
            vec![
                "Don't Stop Believin'".to_string(),
                "Dont Stop Believin".to_string(),
                "Don\u{2019}t Stop Believin\u{2019}".to_string(),
            ]
        );
    }

    #[test]
    fn test_track_variants_suffix_and_conjunctions() {
        let variants = build_track_variants("Rock & Roll (Live)");
        assert_eq!(variants[0], "Rock & Roll (Live)");
        assert!(variants.contains(&"Rock & Roll".to_string()));
        assert!(variants.contains(&"Rock and Roll (Live)".to_string()));
        assert_clean(&variants);

        let variants = build_track_variants("Salt and Pepper");
        assert!(variants.contains(&"Salt & Pepper".to_string()));
    }

    #[test]
    fn test_track_variants_fold_and_collapse() {
        let variants = build_track_variants("Hoppípolla  Live");
        assert!(variants.contains(&"Hoppípolla Live".to_string()));
        assert!(variants.contains(&"Hoppipolla  Live".to_string()));
        assert!(variants.contains(&"Hoppipolla Live".to_string()));
        assert_clean(&variants);
    }

    #[test]
    fn test_track_variants_empty() {
        assert!(build_track_variants("").is_empty());
        assert!(build_track_variants("   ").is_empty());
        // Suffix-only titles must not yield an empty variant
        let variants = build_track_variants("(Intro)");
        assert_eq!(variants, vec!["(Intro)".to_string()]);
    }

    #[test]
    fn test_query_variants() {
        let variants = build_query_variants("  Don\u{2019}t Stop (Live)  ");
        assert_eq!(
            variants,
            vec![
                "Don\u{2019}t Stop (Live)".to_string(),
                "Don't Stop (Live)".to_string(),
                "Dont Stop (Live)".to_string(),
                "Dont Stop".to_string(),
            ]
        );
    }

    #[test]
    fn test_query_variants_conjunctions() {
        let variants = build_query_variants("Simon & Garfunkel");
        assert_eq!(
            variants,
            vec!["Simon & Garfunkel".to_string(), "Simon and Garfunkel".to_string()]
        );
        assert!(build_query_variants("   ").is_empty());
    }

    #[test]
    fn test_variants_never_duplicate_or_empty() {
        let inputs = [
            "Don't Stop Believin'",
            "A & B and C [Remix] - Edit",
            "  spaced   out  ",
            "Ça plane pour moi",
            "\"Heroes\"",
            "'",
            "&",
            "(Live)",
        ];
        for input in inputs {
            assert_clean(&build_track_variants(input));
            assert_clean(&build_query_variants(input));
        }
    }
}
