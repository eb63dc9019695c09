//! Batch matching of a whole query list, with a found/missing report.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::info;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::matcher::match_track;
use crate::models::{MatchOutcome, Query, ScoredCandidate};
use crate::progress::{create_progress_bar, log_progress};
use crate::search::{SearchBackend, SearchPolicy};

/// Queries between log lines in log-only mode.
const LOG_INTERVAL: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Found,
    Missing,
}

/// Outcome for one input query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub status: MatchStatus,
    pub matched: Option<ScoredCandidate>,
    pub early_accept: bool,
    pub queries_issued: usize,
}

/// Per-batch results and totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,

    // Totals
    pub total: usize,
    pub found: usize,
    pub missing: usize,

    // Search budget
    pub queries_issued: usize,
    pub search_failures: usize,
    pub early_accepts: usize,

    // Timing
    pub elapsed_seconds: f64,
}

impl BatchReport {
    fn record(&mut self, query: &Query, outcome: MatchOutcome) {
        self.total += 1;
        self.queries_issued += outcome.queries_issued;
        self.search_failures += outcome.search_failures;

        let early_accept = outcome.result.as_ref().is_some_and(|m| m.early_accept);
        let status = if outcome.result.is_some() {
            self.found += 1;
            MatchStatus::Found
        } else {
            self.missing += 1;
            MatchStatus::Missing
        };
        if early_accept {
            self.early_accepts += 1;
        }

        self.entries.push(BatchEntry {
            title: query.title.clone(),
            artist: query.artist.clone(),
            album: query.album.clone(),
            status,
            matched: outcome.result.map(|m| m.into_scored()),
            early_accept,
            queries_issued: outcome.queries_issued,
        });
    }

    /// Percentage of queries that found a match (0 for an empty batch)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.found as f64 / self.total as f64
        }
    }

    /// Matched catalog ids in input order, each once. Ready to become a playlist.
    pub fn playlist_items(&self) -> Vec<String> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        self.entries
            .iter()
            .filter_map(|e| e.matched.as_ref())
            .filter(|m| seen.insert(m.candidate.id.as_str()))
            .map(|m| m.candidate.id.clone())
            .collect()
    }

    /// "Title - Artist" for every query without a match.
    pub fn missing_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.status == MatchStatus::Missing)
            .map(|e| format!("{} - {}", e.title, e.artist))
            .collect()
    }

    pub fn log_summary(&self) {
        info!(
            "Matched {}/{} tracks ({:.1}%), {} missing, {} early accepts, {} queries, {} search failures, {:.2}s",
            self.found,
            self.total,
            self.success_rate(),
            self.missing,
            self.early_accepts,
            self.queries_issued,
            self.search_failures,
            self.elapsed_seconds
        );
    }

    /// Write the report as pretty JSON
    pub fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Match every query in parallel. Entries keep the input order.
pub fn match_batch<B>(
    backend: &B,
    library: &str,
    queries: &[Query],
    policy: &SearchPolicy,
) -> BatchReport
where
    B: SearchBackend + Sync + ?Sized,
{
    let start = Instant::now();
    let total = queries.len() as u64;
    let pb = create_progress_bar(total, "Matching tracks");
    let done = AtomicU64::new(0);

    let outcomes: Vec<MatchOutcome> = queries
        .par_iter()
        .map(|query| {
            let outcome = match_track(backend, library, query, policy);
            pb.inc(1);
            let current = done.fetch_add(1, Ordering::Relaxed) + 1;
            log_progress("Matching tracks", current, total, LOG_INTERVAL);
            outcome
        })
        .collect();

    let mut report = BatchReport::default();
    for (query, outcome) in queries.iter().zip(outcomes) {
        report.record(query, outcome);
    }
    report.elapsed_seconds = start.elapsed().as_secs_f64();

    pb.finish_with_message(format!("Matched {}/{} tracks", report.found, report.total));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::in_memory_catalog;

    fn queries() -> Vec<Query> {
        vec![
            Query::new("Don't Stop Believin'", "Journey"),
            Query::new("Nonexistent Song", "Nobody"),
            Query::new("Don't Stop Believin'", "Journey"),
            Query::new("", "Daft Punk"),
            Query::new("Get Lucky", ""),
        ]
    }

    fn run() -> BatchReport {
        let catalog = in_memory_catalog(
            "Music",
            &[
                ("Dont Stop Believing", "Journey", Some("Escape")),
                ("Get Lucky", "Daft Punk feat. Pharrell Williams", None),
            ],
        )
        .unwrap();
        match_batch(&catalog, "Music", &queries(), &SearchPolicy::default())
    }

    #[test]
    fn test_batch_totals() {
        let report = run();
        assert_eq!(report.total, 5);
        assert_eq!(report.found, 3);
        assert_eq!(report.missing, 2);
        assert_eq!(report.early_accepts, 2);
        assert_eq!(report.search_failures, 0);
        assert!((report.success_rate() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_batch_preserves_order() {
        let report = run();
        let statuses: Vec<MatchStatus> = report.entries.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                MatchStatus::Found,
                MatchStatus::Missing,
                MatchStatus::Found,
                MatchStatus::Found,
                MatchStatus::Missing
            ]
        );
        assert_eq!(
            report.entries[3].matched.as_ref().map(|m| m.candidate.title.as_str()),
            Some("Get Lucky")
        );
        // Blank artist never searches
        assert_eq!(report.entries[4].queries_issued, 0);
    }

    #[test]
    fn test_playlist_and_missing_lines() {
        let report = run();
        assert_eq!(report.playlist_items(), vec!["1".to_string(), "2".to_string()]);
        assert_eq!(
            report.missing_lines(),
            vec!["Nonexistent Song - Nobody".to_string(), "Get Lucky - ".to_string()]
        );
    }

    #[test]
    fn test_empty_batch() {
        let catalog = in_memory_catalog("Music", &[]).unwrap();
        let report = match_batch(&catalog, "Music", &[], &SearchPolicy::default());
        assert_eq!(report.total, 0);
        assert_eq!(report.success_rate(), 0.0);
        assert!(report.playlist_items().is_empty());
    }

    #[test]
    fn test_unknown_library_degrades_to_missing() {
        let catalog = in_memory_catalog("Music", &[("Everlong", "Foo Fighters", None)]).unwrap();
        let report = match_batch(
            &catalog,
            "Podcasts",
            &[Query::new("Everlong", "Foo Fighters")],
            &SearchPolicy::default(),
        );
        assert_eq!(report.missing, 1);
        assert!(report.search_failures > 0);
    }

    #[test]
    fn test_report_json() {
        let report = run();
        let path =
            std::env::temp_dir().join(format!("trackmatch-report-{}.json", std::process::id()));
        report.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(json["found"], 3);
        assert_eq!(json["entries"][1]["status"], "missing");
        assert_eq!(json["entries"][0]["matched"]["candidate"]["id"], "1");
        assert!(json["entries"][1]["matched"].is_null());
    }
}
