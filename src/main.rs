use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

use trackmatch::batch::match_batch;
use trackmatch::catalog::SqliteCatalog;
use trackmatch::progress::{format_duration, set_log_only};
use trackmatch::{interactive_search, Query, SearchPolicy};

#[derive(Parser)]
#[command(name = "trackmatch")]
#[command(about = "Match loosely-specified tracks against a track catalog")]
struct Args {
    /// Catalog database created by build-catalog
    catalog: PathBuf,

    /// JSON array of {title, artist, album?} to match
    #[arg(long, required_unless_present = "search", conflicts_with = "search")]
    queries: Option<PathBuf>,

    /// Write the full match report (JSON) here
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write "Title - Artist" lines for unmatched queries here
    #[arg(long)]
    missing: Option<PathBuf>,

    /// Free-text search instead of batch matching
    #[arg(long)]
    search: Option<String>,

    /// Artist to fall back to when --search finds nothing
    #[arg(long, requires = "search")]
    artist: Option<String>,

    #[arg(long, default_value = "Music")]
    library: String,

    /// Fallback chain per planned query (exact, prefix[:N], broad)
    #[arg(long, default_value = "exact,prefix:3,broad")]
    tiers: String,

    #[arg(long, default_value = "30")]
    max_results: usize,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars and log progress lines instead (for tail -f)
    #[arg(long)]
    log_only: bool,
}

impl Args {
    fn policy(&self) -> Result<SearchPolicy> {
        let tiers = SearchPolicy::parse_tiers(&self.tiers)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid --tiers")?;
        if self.max_results == 0 {
            bail!("--max-results must be at least 1");
        }
        Ok(SearchPolicy {
            max_results: self.max_results,
            ..SearchPolicy::with_tiers(tiers)
        })
    }
}

fn read_queries(path: &Path) -> Result<Vec<Query>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let queries: Vec<Query> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse queries in {:?}", path))?;
    Ok(queries)
}

fn run_search(
    catalog: &SqliteCatalog,
    args: &Args,
    text: &str,
    policy: &SearchPolicy,
) -> Result<()> {
    let results = interactive_search(catalog, &args.library, text, args.artist.as_deref(), policy)
        .context("Search failed")?;

    println!("\nSearch results for '{}':", text);
    println!("{:-<80}", "");
    for candidate in &results {
        println!(
            "[{}] {} - {} ({})",
            candidate.id,
            candidate.artist_credit,
            candidate.title,
            candidate.album_title.as_deref().unwrap_or("Unknown")
        );
    }
    if results.is_empty() {
        println!("No results found.");
    }
    Ok(())
}

fn run_batch(
    catalog: &SqliteCatalog,
    args: &Args,
    path: &Path,
    policy: &SearchPolicy,
) -> Result<()> {
    let queries = read_queries(path)?;
    info!("Loaded {} queries from {:?}", queries.len(), path);

    let report = match_batch(catalog, &args.library, &queries, policy);
    report.log_summary();

    if let Some(ref output) = args.output {
        report
            .write_to_file(output)
            .with_context(|| format!("Failed to write report to {:?}", output))?;
        info!("Report written to {:?}", output);
    }

    if let Some(ref missing) = args.missing {
        let mut lines = report.missing_lines().join("\n");
        if !lines.is_empty() {
            lines.push('\n');
        }
        std::fs::write(missing, lines).with_context(|| format!("Failed to write {:?}", missing))?;
        info!("{} missing tracks written to {:?}", report.missing, missing);
    }

    println!("\n{:=<60}", "");
    println!("Matching complete!");
    println!("  Queries: {}", report.total);
    println!("  Found: {} ({:.1}%)", report.found, report.success_rate());
    println!("  Missing: {}", report.missing);
    println!("  Playlist items: {}", report.playlist_items().len());
    println!("{:=<60}", "");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let policy = args.policy()?;
    let start = Instant::now();

    info!("Opening catalog: {:?}", args.catalog);
    let catalog = SqliteCatalog::open(&args.catalog)?;

    if let Some(ref text) = args.search {
        run_search(&catalog, &args, text, &policy)?;
    } else if let Some(ref path) = args.queries {
        run_batch(&catalog, &args, path, &policy)?;
    }

    info!("Done in {}", format_duration(start.elapsed()));
    Ok(())
}
