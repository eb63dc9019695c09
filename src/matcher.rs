//! Match selection: drive planned queries against a search backend, score what
//! comes back, and pick the best candidate.
//!
//! One attempt moves through `Planning → Searching → Scoring` and ends in either
//! `EarlyAccept` (a candidate scored above [`EARLY_ACCEPT_THRESHOLD`], remaining
//! queries are never issued) or `Exhausted` (every planned query was tried; the
//! best candidate wins if it scored above the acceptance threshold).
//!
//! Backend faults never abort an attempt. They are logged and the affected
//! query counts as returning nothing.

use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::models::{Candidate, Match, MatchOutcome, MatchResult, Query, ScoredCandidate};
use crate::normalize::primary_artist;
use crate::planner::plan_queries;
use crate::scoring::{
    score_artist_only, score_breakdown, PreparedQuery, ACCEPT_THRESHOLD, ARTIST_ONLY_THRESHOLD,
    EARLY_ACCEPT_THRESHOLD,
};
use crate::search::{SearchBackend, SearchError, SearchKind, SearchPolicy};
use crate::variants::build_query_variants;

// ============================================================================
// Match Selector
// ============================================================================

/// Resolve one query against the catalog, returning the result and search bookkeeping.
pub fn match_track<B: SearchBackend + ?Sized>(
    backend: &B,
    library: &str,
    query: &Query,
    policy: &SearchPolicy,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();

    if !query.has_artist() {
        debug!("Skipping '{}': no artist", query.title);
        return outcome;
    }

    if !query.has_title() {
        match_artist_only(backend, library, query, policy, &mut outcome);
        return outcome;
    }

    let prepared = PreparedQuery::new(query);
    let plan = plan_queries(query);
    debug!("Planned {} queries for '{}'", plan.len(), query.label());

    let result = run_plan(backend, library, &plan, policy, &mut outcome, |candidate| {
        score_breakdown(&prepared, candidate).total
    });
    outcome.result = result;
    outcome
}

/// Resolve one query, keeping only the result.
pub fn find_best_match<B: SearchBackend + ?Sized>(
    backend: &B,
    library: &str,
    query: &Query,
    policy: &SearchPolicy,
) -> MatchResult {
    match_track(backend, library, query, policy).result
}

/// Issue planned queries in order, scoring each newly seen candidate.
fn run_plan<B, F>(
    backend: &B,
    library: &str,
    plan: &[String],
    policy: &SearchPolicy,
    outcome: &mut MatchOutcome,
    mut score: F,
) -> MatchResult
where
    B: SearchBackend + ?Sized,
    F: FnMut(&Candidate) -> f64,
{
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut best: Option<ScoredCandidate> = None;

    for planned in plan {
        outcome.queries_issued += 1;

        for candidate in search_with_fallback(backend, library, planned, policy, outcome) {
            if !seen.insert(candidate.id.clone()) {
                continue;
            }

            let candidate_score = score(&candidate);
            if candidate_score > EARLY_ACCEPT_THRESHOLD {
                debug!(
                    "Early accept '{}' ({:.3}) after {} queries",
                    candidate.title, candidate_score, outcome.queries_issued
                );
                return Some(Match {
                    candidate,
                    score: candidate_score,
                    early_accept: true,
                });
            }

            if is_new_best(candidate_score, ACCEPT_THRESHOLD, best.as_ref()) {
                best = Some(ScoredCandidate {
                    candidate,
                    score: candidate_score,
                });
            }
        }
    }

    best.map(|b| Match {
        candidate: b.candidate,
        score: b.score,
        early_accept: false,
    })
}

/// Run the policy's fallback tiers for one planned query.
/// The first tier returning candidates wins; a fault ends the query with nothing.
fn search_with_fallback<B: SearchBackend + ?Sized>(
    backend: &B,
    library: &str,
    planned: &str,
    policy: &SearchPolicy,
    outcome: &mut MatchOutcome,
) -> Vec<Candidate> {
    for tier in &policy.tiers {
        match tier.run(backend, library, planned, policy.max_results) {
            Ok(None) => continue,
            Ok(Some(found)) => {
                outcome.search_calls += 1;
                if !found.is_empty() {
                    return found;
                }
                debug!("No results for '{}' ({} tier)", planned, tier);
            }
            Err(e) => {
                outcome.search_calls += 1;
                outcome.search_failures += 1;
                warn!("Error searching for '{}' ({} tier): {}", planned, tier, e);
                return Vec::new();
            }
        }
    }
    Vec::new()
}

/// Artist-only lookup for queries without a title: one artist search, scored on
/// primary-artist similarity alone, no early exit.
fn match_artist_only<B: SearchBackend + ?Sized>(
    backend: &B,
    library: &str,
    query: &Query,
    policy: &SearchPolicy,
    outcome: &mut MatchOutcome,
) {
    outcome.queries_issued = 1;
    outcome.search_calls = 1;

    let searched = backend.search_by_artist(library, &query.artist, policy.artist_max_results);
    let candidates = match searched {
        Ok(found) => found,
        Err(e) => {
            outcome.search_failures = 1;
            warn!("Error searching for artist '{}': {}", query.artist, e);
            Vec::new()
        }
    };

    let main_artist = primary_artist(&query.artist);
    outcome.result = select_best(candidates, ARTIST_ONLY_THRESHOLD, |candidate| {
        score_artist_only(&main_artist, candidate)
    });
}

/// Highest-scoring candidate strictly above `threshold`. Earlier candidates win ties.
fn select_best<F>(candidates: Vec<Candidate>, threshold: f64, mut score: F) -> MatchResult
where
    F: FnMut(&Candidate) -> f64,
{
    let mut best: Option<ScoredCandidate> = None;
    for candidate in dedupe_candidates(candidates) {
        let candidate_score = score(&candidate);
        if is_new_best(candidate_score, threshold, best.as_ref()) {
            best = Some(ScoredCandidate {
                candidate,
                score: candidate_score,
            });
        }
    }
    best.map(|b| Match {
        candidate: b.candidate,
        score: b.score,
        early_accept: false,
    })
}

fn is_new_best(score: f64, threshold: f64, best: Option<&ScoredCandidate>) -> bool {
    score > threshold && best.map_or(true, |b| score > b.score)
}

/// Drop repeated candidate ids, keeping the first occurrence.
pub fn dedupe_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}

// ============================================================================
// Interactive Search
// ============================================================================

/// Free-text search for a person picking a track by hand.
///
/// Every spelling from [`build_query_variants`] is searched by title and the
/// results pooled. With nothing found, falls back to the original artist, then
/// to a broad track search, which yields nothing if any of its calls fails.
/// Unauthorized/unknown-library faults are returned so the caller can report
/// them; other faults are logged and skipped.
pub fn interactive_search<B: SearchBackend + ?Sized>(
    backend: &B,
    library: &str,
    text: &str,
    original_artist: Option<&str>,
    policy: &SearchPolicy,
) -> Result<Vec<Candidate>, SearchError> {
    let text = text.trim();
    let artist = original_artist.map(str::trim).filter(|a| !a.is_empty());
    if text.is_empty() && artist.is_none() {
        return Ok(Vec::new());
    }

    let cap = policy.interactive_max_results;
    let mut results: Vec<Candidate> = Vec::new();

    for variant in build_query_variants(text) {
        match backend.search_by_title(library, &variant, cap) {
            Ok(found) => results.extend(found),
            Err(e) if e.is_configuration() => return Err(e),
            Err(e) => warn!("Error searching for '{}': {}", variant, e),
        }
    }

    if results.is_empty() {
        if let Some(artist) = artist {
            match backend.search_by_artist(library, artist, cap) {
                Ok(found) => results = found,
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => warn!("Error searching for artist '{}': {}", artist, e),
            }
        }
    }

    if results.is_empty() {
        let broad_text = if text.is_empty() { artist.unwrap_or_default() } else { text };
        for variant in build_query_variants(broad_text) {
            match backend.broad_search(library, &variant, SearchKind::Track, cap) {
                Ok(found) => results.extend(found),
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => {
                    warn!("Broad search failed for '{}': {}", variant, e);
                    results.clear();
                    break;
                }
            }
        }
    }

    Ok(dedupe_candidates(results))
}

// ============================================================================
// TESTS
// ============================================================================
