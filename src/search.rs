//! Catalog search seam.
//!
//! The engine never talks to a media server directly: callers inject a
//! [`SearchBackend`] per match attempt, and a [`SearchPolicy`] decides how hard
//! each planned query is pushed (exact title search, coarser prefix, broad search).

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::models::Candidate;

// ============================================================================
// Errors
// ============================================================================

/// Fault raised by a search backend. "No results" is an empty `Vec`, never an error.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Backend could not be reached (network, closed connection, ...)
    #[error("catalog unreachable: {0}")]
    Connectivity(String),

    /// Credentials rejected
    #[error("not authorized to search the catalog: {0}")]
    Unauthorized(String),

    /// Named library does not exist
    #[error("library '{0}' not found")]
    LibraryNotFound(String),

    /// Any other backend failure
    #[error("catalog search failed: {0}")]
    Backend(String),
}

impl SearchError {
    /// Faults caused by caller configuration rather than a single bad query.
    /// Interactive callers surface these; the match engine still degrades.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SearchError::Unauthorized(_) | SearchError::LibraryNotFound(_))
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(e: rusqlite::Error) -> Self {
        SearchError::Backend(e.to_string())
    }
}

// ============================================================================
// Backend Trait
// ============================================================================

/// Result kinds for a broad search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Track,
    Album,
    Artist,
}

impl SearchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchKind::Track => "track",
            SearchKind::Album => "album",
            SearchKind::Artist => "artist",
        }
    }
}

/// External catalog search collaborator.
///
/// Implementations return an empty list for "no results" and an error only for
/// real faults (connectivity, authorization, unknown library).
pub trait SearchBackend {
    /// Tracks whose title matches `query`.
    fn search_by_title(
        &self,
        library: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Candidate>, SearchError>;

    /// Tracks credited to `artist`.
    fn search_by_artist(
        &self,
        library: &str,
        artist: &str,
        max_results: usize,
    ) -> Result<Vec<Candidate>, SearchError>;

    /// Free-text search over every field, restricted to `kind`.
    fn broad_search(
        &self,
        library: &str,
        query: &str,
        kind: SearchKind,
        max_results: usize,
    ) -> Result<Vec<Candidate>, SearchError>;
}

macro_rules! forward_search_backend {
    ($($wrapper:ty),*) => {
        $(
            impl<T: SearchBackend + ?Sized> SearchBackend for $wrapper {
                fn search_by_title(
                    &self,
                    library: &str,
                    query: &str,
                    max_results: usize,
                ) -> Result<Vec<Candidate>, SearchError> {
                    (**self).search_by_title(library, query, max_results)
                }

                fn search_by_artist(
                    &self,
                    library: &str,
                    artist: &str,
                    max_results: usize,
                ) -> Result<Vec<Candidate>, SearchError> {
                    (**self).search_by_artist(library, artist, max_results)
                }

                fn broad_search(
                    &self,
                    library: &str,
                    query: &str,
                    kind: SearchKind,
                    max_results: usize,
                ) -> Result<Vec<Candidate>, SearchError> {
                    (**self).broad_search(library, query, kind, max_results)
                }
            }
        )*
    };
}

forward_search_backend!(&T, Box<T>, Rc<T>, Arc<T>);

// ============================================================================
// Fallback Policy
// ============================================================================

/// One step of the per-query fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTier {
    /// Title search with the planned query as-is.
    Exact,
    /// Title search with only the first `words` words of the query.
    /// Skipped when the query has no space or the prefix equals the query.
    CoarsePrefix { words: usize },
    /// Broad free-text search restricted to tracks.
    Broad,
}

impl SearchTier {
    /// Run this tier for one planned query.
    /// `Ok(None)` means the tier does not apply to this query and no call was made.
    pub fn run<B: SearchBackend + ?Sized>(
        &self,
        backend: &B,
        library: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Option<Vec<Candidate>>, SearchError> {
        match *self {
            SearchTier::Exact => backend.search_by_title(library, query, max_results).map(Some),
            SearchTier::CoarsePrefix { words } => {
                if !query.contains(' ') {
                    return Ok(None);
                }
                let prefix = query.split_whitespace().take(words).collect::<Vec<_>>().join(" ");
                if prefix.is_empty() || prefix == query {
                    return Ok(None);
                }
                backend.search_by_title(library, &prefix, max_results).map(Some)
            }
            SearchTier::Broad => backend
                .broad_search(library, query, SearchKind::Track, max_results)
                .map(Some),
        }
    }
}

impl fmt::Display for SearchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchTier::Exact => write!(f, "exact"),
            SearchTier::CoarsePrefix { words } => write!(f, "prefix:{}", words),
            SearchTier::Broad => write!(f, "broad"),
        }
    }
}

impl FromStr for SearchTier {
    type Err = String;

    /// Parses `exact`, `prefix`, `prefix:N` and `broad` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "exact" => Ok(SearchTier::Exact),
            "broad" => Ok(SearchTier::Broad),
            "prefix" => Ok(SearchTier::CoarsePrefix {
                words: DEFAULT_PREFIX_WORDS,
            }),
            other => {
                let words = other
                    .strip_prefix("prefix:")
                    .ok_or_else(|| format!("unknown search tier '{}'", s.trim()))?;
                let words: usize = words
                    .parse()
                    .map_err(|_| format!("invalid prefix length in '{}'", s.trim()))?;
                if words == 0 {
                    return Err("prefix length must be at least 1".to_string());
                }
                Ok(SearchTier::CoarsePrefix { words })
            }
        }
    }
}

/// Words kept by the default coarse-prefix retry.
pub const DEFAULT_PREFIX_WORDS: usize = 3;

/// Result caps and the fallback chain applied to every planned query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPolicy {
    /// Tried in order; the first tier returning candidates wins.
    pub tiers: Vec<SearchTier>,
    /// Cap for title/broad searches of planned queries.
    pub max_results: usize,
    /// Cap for the artist-only lookup.
    pub artist_max_results: usize,
    /// Cap for each interactive search call.
    pub interactive_max_results: usize,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                SearchTier::Exact,
                SearchTier::CoarsePrefix {
                    words: DEFAULT_PREFIX_WORDS,
                },
                SearchTier::Broad,
            ],
            max_results: 30,
            artist_max_results: 20,
            interactive_max_results: 20,
        }
    }
}

impl SearchPolicy {
    /// Policy with a custom fallback chain and default result caps.
    pub fn with_tiers(tiers: Vec<SearchTier>) -> Self {
        Self {
            tiers,
            ..Self::default()
        }
    }

    /// Parse a comma-separated tier list such as `exact,prefix:3,broad`.
    pub fn parse_tiers(list: &str) -> Result<Vec<SearchTier>, String> {
        let tiers = list
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<SearchTier>, String>>()?;
        if tiers.is_empty() {
            return Err("at least one search tier is required".to_string());
        }
        Ok(tiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every call and answers title searches only for one string.
    struct Recorder {
        calls: RefCell<Vec<String>>,
        answer_title: &'static str,
    }

    impl SearchBackend for Recorder {
        fn search_by_title(
            &self,
            _: &str,
            query: &str,
            _: usize,
        ) -> Result<Vec<Candidate>, SearchError> {
            self.calls.borrow_mut().push(format!("title:{}", query));
            if query == self.answer_title {
                Ok(vec![Candidate::new("1", query, "x")])
            } else {
                Ok(Vec::new())
            }
        }

        fn search_by_artist(
            &self,
            _: &str,
            artist: &str,
            _: usize,
        ) -> Result<Vec<Candidate>, SearchError> {
            self.calls.borrow_mut().push(format!("artist:{}", artist));
            Ok(Vec::new())
        }

        fn broad_search(
            &self,
            _: &str,
            query: &str,
            kind: SearchKind,
            _: usize,
        ) -> Result<Vec<Candidate>, SearchError> {
            self.calls.borrow_mut().push(format!("broad:{}:{}", kind.as_str(), query));
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_parse_tiers() {
        assert_eq!(
            SearchPolicy::parse_tiers("exact, prefix:2 ,BROAD").unwrap(),
            vec![
                SearchTier::Exact,
                SearchTier::CoarsePrefix { words: 2 },
                SearchTier::Broad
            ]
        );
        assert_eq!(
            SearchPolicy::parse_tiers("prefix").unwrap(),
            vec![SearchTier::CoarsePrefix { words: 3 }]
        );
        assert!(SearchPolicy::parse_tiers("").is_err());
        assert!(SearchPolicy::parse_tiers("exact,fuzzy").is_err());
        assert!(SearchPolicy::parse_tiers("prefix:0").is_err());
    }

    #[test]
    fn test_tier_display_round_trips() {
        for tier in SearchPolicy::default().tiers {
            assert_eq!(tier.to_string().parse::<SearchTier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_coarse_prefix_tier() {
        let backend = Recorder {
            calls: RefCell::new(Vec::new()),
            answer_title: "one two three",
        };
        let tier = SearchTier::CoarsePrefix { words: 3 };

        let hit = tier.run(&backend, "Music", "one two three four", 30).unwrap();
        assert_eq!(hit.map(|c| c.len()), Some(1));

        // Single word and already-short queries are skipped without a call
        assert_eq!(tier.run(&backend, "Music", "single", 30).unwrap(), None);
        assert_eq!(tier.run(&backend, "Music", "one two", 30).unwrap(), None);
        assert_eq!(backend.calls.borrow().as_slice(), &["title:one two three".to_string()]);
    }

    #[test]
    fn test_broad_tier_is_track_kind() {
        let backend = Recorder {
            calls: RefCell::new(Vec::new()),
            answer_title: "",
        };
        let found = SearchTier::Broad.run(&backend, "Music", "anything", 30).unwrap();
        assert_eq!(found, Some(Vec::new()));
        assert_eq!(backend.calls.borrow()[0], "broad:track:anything");
    }

    #[test]
    fn test_configuration_errors() {
        assert!(SearchError::Unauthorized("bad token".into()).is_configuration());
        assert!(SearchError::LibraryNotFound("Music".into()).is_configuration());
        assert!(!SearchError::Connectivity("timeout".into()).is_configuration());
        assert!(!SearchError::Backend("boom".into()).is_configuration());
    }
}
