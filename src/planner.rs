//! Ordered list of catalog search strings for one query.

use crate::models::Query;
use crate::normalize::{dedupe_ordered, split_artists};
use crate::variants::build_track_variants;

/// Build the search strings tried in sequence for a titled query.
///
/// 1. every title variant with the full artist credit, then the variant alone
/// 2. every title variant with the primary artist
/// 3. title + album and title + artist + album, when an album is known
///
/// Returns an empty plan for a blank title; the selector handles that case with
/// an artist-only lookup.
pub fn plan_queries(query: &Query) -> Vec<String> {
    if !query.has_title() {
        return Vec::new();
    }

    let variants = build_track_variants(&query.title);
    let artist = query.artist.as_str();
    let mut planned: Vec<String> = Vec::with_capacity(variants.len() * 3 + 2);

    for variant in &variants {
        planned.push(format!("{} {}", variant, artist));
        planned.push(variant.clone());
    }

    if let Some(primary) = split_artists(artist).into_iter().next() {
        for variant in &variants {
            planned.push(format!("{} {}", variant, primary));
        }
    }

    if let Some(album) = query.album() {
        planned.push(format!("{} {}", query.title, album));
        planned.push(format!("{} {} {}", query.title, artist, album));
    }

    dedupe_ordered(planned.into_iter().map(|q| q.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_plan_order() {
        let plan = plan_queries(&Query::new("Don't Stop Believin'", "Journey"));
        assert_eq!(
            plan,
            vec![
                "Don't Stop Believin' Journey",
                "Don't Stop Believin'",
                "Dont Stop Believin Journey",
                "Dont Stop Believin",
                "Don\u{2019}t Stop Believin\u{2019} Journey",
                "Don\u{2019}t Stop Believin\u{2019}",
                "Don't Stop Believin' journey",
                "Dont Stop Believin journey",
                "Don\u{2019}t Stop Believin\u{2019} journey",
            ]
        );
    }

    #[test]
    fn test_plan_with_album() {
        let query = Query::new("Get Lucky", "Daft Punk feat. Pharrell Williams")
            .with_album("Random Access Memories");
        let plan = plan_queries(&query);
        assert_eq!(plan[0], "Get Lucky Daft Punk feat. Pharrell Williams");
        assert_eq!(plan[1], "Get Lucky");
        assert!(plan.contains(&"Get Lucky daft punk".to_string()));
        assert_eq!(
            &plan[plan.len() - 2..],
            &[
                "Get Lucky Random Access Memories".to_string(),
                "Get Lucky Daft Punk feat. Pharrell Williams Random Access Memories".to_string(),
            ]
        );
    }

    #[test]
    fn test_plan_blank_album_ignored() {
        let with_blank = plan_queries(&Query::new("Get Lucky", "Daft Punk").with_album("  "));
        let without = plan_queries(&Query::new("Get Lucky", "Daft Punk"));
        assert_eq!(with_blank, without);
    }

    #[test]
    fn test_plan_empty_title() {
        assert!(plan_queries(&Query::new("", "Daft Punk")).is_empty());
        assert!(plan_queries(&Query::new("   ", "Daft Punk")).is_empty());
    }

    #[test]
    fn test_plan_never_duplicate_or_empty() {
        let queries = [
            Query::new("Song", "song"),
            Query::new("A & B (Live) - Edit", "X feat. Y & Z").with_album("Album"),
            Query::new("(Intro)", "  "),
            Query::new("Rock and Roll", "Led Zeppelin").with_album("IV"),
        ];
        for query in &queries {
            let plan = plan_queries(query);
            let unique: FxHashSet<&String> = plan.iter().collect();
            assert_eq!(unique.len(), plan.len(), "duplicates in {:?}", plan);
            assert!(plan.iter().all(|q| !q.is_empty()));
        }
    }
}
