//! Core data models for track matching.
//!
//! This module contains the query/candidate types handed between the planner,
//! the scorer and the match selector, plus the per-attempt outcome.

use serde::{Deserialize, Serialize};

// ============================================================================
// Input
// ============================================================================

/// Loosely-specified track reference to resolve against the catalog.
/// Title may be empty (artist-only lookup); artist is required.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl Query {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Album text when present and not blank.
    pub fn album(&self) -> Option<&str> {
        self.album.as_deref().filter(|a| !a.trim().is_empty())
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn has_artist(&self) -> bool {
        !self.artist.trim().is_empty()
    }

    /// "Title - Artist" label used in logs and missing-track reports.
    pub fn label(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

// ============================================================================
// Catalog Side
// ============================================================================

/// One track returned by the catalog search. Read-only to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String, // Opaque catalog key (e.g. a media-server rating key)
    pub title: String,
    pub artist_credit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_title: Option<String>,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist_credit: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_credit: artist_credit.into(),
            album_title: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album_title = Some(album.into());
        self
    }
}

/// Candidate with the score it received during one match attempt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

// ============================================================================
// Output
// ============================================================================

/// Accepted match for one query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Match {
    pub candidate: Candidate,
    pub score: f64,
    /// True when the attempt stopped early because the score crossed the early-accept bar.
    pub early_accept: bool,
}

impl Match {
    pub fn into_scored(self) -> ScoredCandidate {
        ScoredCandidate {
            candidate: self.candidate,
            score: self.score,
        }
    }
}

/// Terminal output of one match attempt. `None` is a normal outcome, not an error.
pub type MatchResult = Option<Match>;

/// Match result plus bookkeeping about how much of the search budget was spent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchOutcome {
    pub result: MatchResult,
    /// Planned queries that were started (artist-only lookups count as one).
    pub queries_issued: usize,
    /// Calls made to the search backend, fallback tiers included.
    pub search_calls: usize,
    /// Backend calls that returned an error.
    pub search_failures: usize,
}
