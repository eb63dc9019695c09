//! Load a JSON track list into a fresh SQLite catalog.
//!
//! Usage: build-catalog tracks.json catalog.sqlite3 [--library Music]

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use trackmatch::catalog::{SqliteCatalog, TrackRecord};
use trackmatch::progress::{format_duration, set_log_only};

#[derive(Parser)]
#[command(name = "build-catalog")]
#[command(about = "Build a searchable track catalog from a JSON track list")]
struct Args {
    /// JSON array of {title, artist, album?}
    tracks: PathBuf,

    output: PathBuf,

    #[arg(long, default_value = "Music")]
    library: String,

    /// Replace an existing output file
    #[arg(long)]
    force: bool,

    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    set_log_only(args.log_only);

    let input = std::fs::canonicalize(&args.tracks)
        .with_context(|| format!("Track list {:?} not found", args.tracks))?;
    if let Ok(output) = std::fs::canonicalize(&args.output) {
        if output == input {
            bail!("Output {:?} would overwrite the input track list", args.output);
        }
    }

    let start = Instant::now();

    let text = std::fs::read_to_string(&input).context("Failed to read track list")?;
    let tracks: Vec<TrackRecord> =
        serde_json::from_str(&text).context("Failed to parse track list")?;
    info!("Read {} tracks from {:?}", tracks.len(), args.tracks);

    if args.output.exists() {
        if !args.force {
            bail!("{:?} already exists (use --force to replace it)", args.output);
        }
        std::fs::remove_file(&args.output).context("Failed to remove existing output file")?;
    }

    info!("Creating catalog: {:?}", args.output);
    let catalog = SqliteCatalog::create(&args.output)?;
    catalog.insert_tracks(&args.library, &tracks)?;
    catalog.rebuild_fts()?;
    catalog.optimize()?;

    let count = catalog.track_count()?;
    drop(catalog);
    let file_size = std::fs::metadata(&args.output)?.len();

    println!("\n{:=<60}", "");
    println!("Catalog complete!");
    println!("  Library: {}", args.library);
    println!("  Tracks: {}", count);
    println!("  Output size: {:.2} MB", file_size as f64 / 1_048_576.0);
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
