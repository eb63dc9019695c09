//! Scoring functions for candidate tracks.
//!
//! This module contains:
//! - Score thresholds and weights
//! - Title similarity with substring and "title + artist" boosts
//! - Combined scoring for titled queries
//! - Artist-only scoring for queries without a title

use crate::models::{Candidate, Query};
use crate::normalize::{normalize_optional, normalize_text, primary_artist};
use crate::similarity::ratio;
use crate::variants::build_track_variants;

// ============================================================================
// Score Thresholds
// ============================================================================

/// Minimum score to accept a match for a titled query
pub const ACCEPT_THRESHOLD: f64 = 0.70;

/// Minimum score to accept a match for an artist-only query
pub const ARTIST_ONLY_THRESHOLD: f64 = 0.75;

/// Above this, the selector stops searching and returns the candidate
pub const EARLY_ACCEPT_THRESHOLD: f64 = 0.90;

// ============================================================================
// Weights and Boosts
// ============================================================================

pub const TITLE_WEIGHT: f64 = 0.6;
pub const ARTIST_WEIGHT: f64 = 0.4;

/// Primary-artist similarity is discounted against the full-credit similarity
pub const MAIN_ARTIST_DISCOUNT: f64 = 0.9;

/// Flat bonus when the query album is contained in the candidate album
pub const ALBUM_BOOST: f64 = 0.05;

/// Title floor when one normalized title contains the other
pub const SUBSTRING_TITLE_FLOOR: f64 = 0.8;

/// Title floor when "title + artist" strings are close
pub const COMBINED_PATTERN_FLOOR: f64 = 0.9;
pub const COMBINED_PATTERN_MIN: f64 = 0.8;

/// Strong primary artist + reasonable title lifts the total to this floor
pub const ARTIST_OVERRIDE_FLOOR: f64 = 0.85;
pub const ARTIST_OVERRIDE_MIN_ARTIST: f64 = 0.8;
pub const ARTIST_OVERRIDE_MIN_TITLE: f64 = 0.6;

// ============================================================================
// Prepared Query
// ============================================================================

/// Normalized pieces of a query, computed once per match attempt and reused for
/// every candidate.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub title_variants: Vec<String>, // Normalized, non-empty, deduplicated
    pub artist: String,
    pub main_artist: String,
    pub album: String,
}

impl PreparedQuery {
    pub fn new(query: &Query) -> Self {
        let mut title_variants: Vec<String> = Vec::new();
        for variant in build_track_variants(&query.title) {
            let norm = normalize_text(&variant);
            if !norm.is_empty() && !title_variants.contains(&norm) {
                title_variants.push(norm);
            }
        }

        Self {
            title_variants,
            artist: normalize_text(&query.artist),
            main_artist: primary_artist(&query.artist),
            album: normalize_optional(query.album()),
        }
    }
}

// ============================================================================
// Score Breakdown
// ============================================================================

/// All intermediate similarities behind one candidate score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub track: f64,
    pub artist: f64,
    pub main_artist: f64,
    pub album_boost: f64,
    pub total: f64,
}

/// Title similarity for one normalized variant, boosts applied.
fn title_similarity(
    variant: &str,
    main_artist: &str,
    candidate_title: &str,
    candidate_main_artist: &str,
) -> f64 {
    let mut track = ratio(variant, candidate_title);

    if !variant.is_empty()
        && !candidate_title.is_empty()
        && (candidate_title.contains(variant) || variant.contains(candidate_title))
    {
        track = track.max(SUBSTRING_TITLE_FLOOR);
    }

    let patterns = [
        (
            format!("{} {}", variant, main_artist),
            format!("{} {}", candidate_title, candidate_main_artist),
        ),
        (
            format!("{} {}", main_artist, variant),
            format!("{} {}", candidate_main_artist, candidate_title),
        ),
    ];
    if patterns
        .iter()
        .any(|(ours, theirs)| ratio(ours, theirs) > COMBINED_PATTERN_MIN)
    {
        track = track.max(COMBINED_PATTERN_FLOOR);
    }

    track
}

/// Score a candidate against a prepared query, keeping the intermediate values.
///
/// The total is not clamped: album boost and floors can push well-formed inputs
/// to 1.0 and adversarial ones slightly above.
pub fn score_breakdown(prepared: &PreparedQuery, candidate: &Candidate) -> ScoreBreakdown {
    let candidate_title = normalize_text(&candidate.title);
    let candidate_artist = normalize_text(&candidate.artist_credit);
    let candidate_main_artist = primary_artist(&candidate.artist_credit);

    let track = prepared
        .title_variants
        .iter()
        .map(|v| {
            title_similarity(v, &prepared.main_artist, &candidate_title, &candidate_main_artist)
        })
        .fold(0.0, f64::max);

    let artist = ratio(&prepared.artist, &candidate_artist);
    let main_artist = ratio(&prepared.main_artist, &candidate_main_artist);

    let album_boost = if !prepared.album.is_empty()
        && normalize_optional(candidate.album_title.as_deref()).contains(&prepared.album)
    {
        ALBUM_BOOST
    } else {
        0.0
    };

    let effective_artist = artist.max(main_artist * MAIN_ARTIST_DISCOUNT);
    let mut total = track * TITLE_WEIGHT + effective_artist * ARTIST_WEIGHT + album_boost;

    if main_artist > ARTIST_OVERRIDE_MIN_ARTIST && track > ARTIST_OVERRIDE_MIN_TITLE {
        total = total.max(ARTIST_OVERRIDE_FLOOR);
    }

    ScoreBreakdown {
        track,
        artist,
        main_artist,
        album_boost,
        total,
    }
}

/// Weighted similarity between a titled query and one candidate.
pub fn score_candidate(query: &Query, candidate: &Candidate) -> f64 {
    score_breakdown(&PreparedQuery::new(query), candidate).total
}

/// Primary-artist similarity, the only signal for artist-only lookups.
pub fn score_artist_only(query_main_artist: &str, candidate: &Candidate) -> f64 {
    ratio(query_main_artist, &primary_artist(&candidate.artist_credit))
}

// ============================================================================
// TESTS
// ============================================================================
