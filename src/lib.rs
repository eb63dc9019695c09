//! Fuzzy track matching library - shared modules for all binaries.

pub mod batch;
pub mod catalog;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod planner;
pub mod progress;
pub mod scoring;
pub mod search;
pub mod similarity;
pub mod variants;

pub use matcher::{find_best_match, interactive_search, match_track};
pub use models::{Candidate, Match, MatchOutcome, MatchResult, Query, ScoredCandidate};
pub use search::{SearchBackend, SearchError, SearchKind, SearchPolicy, SearchTier};
