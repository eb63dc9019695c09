//! SQLite-backed track catalog.
//!
//! Stores tracks per library with normalized title/artist columns for substring
//! search, plus an FTS5 index over the normalized text for broad search. Build a
//! catalog in phases: `create` → `insert_tracks` → `rebuild_fts` → `optimize`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::models::Candidate;
use crate::normalize::{normalize_optional, normalize_text};
use crate::progress::{create_progress_bar, create_spinner, log_progress};
use crate::search::{SearchBackend, SearchError, SearchKind};

/// Rows written per transaction.
const WRITE_BATCH_SIZE: usize = 10_000;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS libraries (
        name TEXT PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS tracks (
        id INTEGER PRIMARY KEY,
        library TEXT NOT NULL REFERENCES libraries(name),
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        album TEXT,
        title_norm TEXT NOT NULL,
        artist_norm TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tracks_library ON tracks(library);

    CREATE VIRTUAL TABLE IF NOT EXISTS tracks_fts USING fts5(
        title, artist, album
    );";

/// One track to load into the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
}

impl TrackRecord {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, album: Option<&str>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: album.map(str::to_string),
        }
    }
}

/// Track catalog in one SQLite database. `Sync`, so a batch can search it from
/// several worker threads (calls are serialized on the connection).
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Create a fresh catalog file. Fails if the file already exists.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            bail!("Catalog {:?} already exists", path);
        }
        let conn = Connection::open(path).context("Failed to create catalog database")?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;",
        )?;
        Self::with_schema(conn)
    }

    pub fn create_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory catalog")?;
        Self::with_schema(conn)
    }

    fn with_schema(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("Failed to create catalog schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an existing catalog.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Catalog {:?} does not exist", path);
        }
        let conn = Connection::open(path).context("Failed to open catalog database")?;
        let has_tracks: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'tracks')",
            [],
            |row| row.get(0),
        )?;
        if !has_tracks {
            bail!("{:?} is not a track catalog (no tracks table)", path);
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("Catalog connection poisoned"))
    }

    fn lock_for_search(&self) -> Result<MutexGuard<'_, Connection>, SearchError> {
        self.conn
            .lock()
            .map_err(|_| SearchError::Backend("catalog connection poisoned".to_string()))
    }

    /// Add tracks to `library` (created on first use). Returns the number written.
    pub fn insert_tracks(&self, library: &str, tracks: &[TrackRecord]) -> Result<usize> {
        let mut conn = self.lock()?;
        conn.execute("INSERT OR IGNORE INTO libraries (name) VALUES (?1)", [library])?;

        let total = tracks.len() as u64;
        let pb = create_progress_bar(total, "Writing tracks");
        let mut written: u64 = 0;

        for chunk in tracks.chunks(WRITE_BATCH_SIZE) {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO tracks (library, title, artist, album, title_norm, artist_norm)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for track in chunk {
                    stmt.execute(params![
                        library,
                        track.title,
                        track.artist,
                        track.album,
                        normalize_text(&track.title),
                        normalize_text(&track.artist),
                    ])?;
                }
            }
            tx.commit()?;

            written += chunk.len() as u64;
            pb.inc(chunk.len() as u64);
            log_progress("Writing tracks", written, total, WRITE_BATCH_SIZE as u64);
        }

        pb.finish_with_message(format!("Wrote {} tracks", tracks.len()));
        Ok(tracks.len())
    }

    /// Rebuild the full-text index from the normalized track columns.
    pub fn rebuild_fts(&self) -> Result<usize> {
        let spinner = create_spinner("Building FTS index");
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM tracks_fts", [])?;

        let mut indexed = 0;
        {
            let mut select =
                tx.prepare("SELECT id, album, title_norm, artist_norm FROM tracks ORDER BY id")?;
            let mut insert = tx.prepare(
                "INSERT INTO tracks_fts (rowid, title, artist, album) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut rows = select.query([])?;
            while let Some(row) = rows.next()? {
                let id: i64 = row.get(0)?;
                let album: Option<String> = row.get(1)?;
                let title_norm: String = row.get(2)?;
                let artist_norm: String = row.get(3)?;
                let album_norm = normalize_optional(album.as_deref());
                insert.execute(params![id, title_norm, artist_norm, album_norm])?;
                indexed += 1;
            }
        }
        tx.commit()?;

        spinner.finish_with_message(format!("FTS index built ({} tracks)", indexed));
        Ok(indexed)
    }

    pub fn optimize(&self) -> Result<()> {
        let spinner = create_spinner("Optimizing catalog");
        let conn = self.lock()?;
        conn.execute("INSERT INTO tracks_fts(tracks_fts) VALUES('optimize')", [])?;
        conn.execute_batch("VACUUM; ANALYZE;")?;
        spinner.finish_with_message("Catalog optimized");
        Ok(())
    }

    pub fn track_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn libraries(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM libraries ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Substring search over one normalized column.
    fn search_column(
        &self,
        library: &str,
        column: NormColumn,
        text: &str,
        max_results: usize,
    ) -> Result<Vec<Candidate>, SearchError> {
        let needle = normalize_text(text);
        let conn = self.lock_for_search()?;
        ensure_library(&conn, library)?;
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, title, artist, album FROM tracks
             WHERE library = ?1 AND {} LIKE ?2
             ORDER BY id
             LIMIT ?3",
            column.as_str()
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let candidates = stmt
            .query_map(
                params![library, format!("%{}%", needle), max_results as i64],
                row_to_candidate,
            )?
            .collect::<rusqlite::Result<Vec<Candidate>>>()?;

        debug!("{} LIKE '{}' -> {} rows", column.as_str(), needle, candidates.len());
        Ok(candidates)
    }
}

#[derive(Clone, Copy)]
enum NormColumn {
    Title,
    Artist,
}

impl NormColumn {
    fn as_str(self) -> &'static str {
        match self {
            NormColumn::Title => "title_norm",
            NormColumn::Artist => "artist_norm",
        }
    }
}

fn ensure_library(conn: &Connection, library: &str) -> Result<(), SearchError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM libraries WHERE name = ?1", [library], |row| row.get(0))
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(SearchError::LibraryNotFound(library.to_string())),
    }
}

fn row_to_candidate(row: &rusqlite::Row<'_>) -> rusqlite::Result<Candidate> {
    let id: i64 = row.get(0)?;
    Ok(Candidate {
        id: id.to_string(),
        title: row.get(1)?,
        artist_credit: row.get(2)?,
        album_title: row.get(3)?,
    })
}

/// FTS5 expression matching every normalized token as a prefix.
/// e.g., ("dont stop", Artist) → `artist : "dont"* artist : "stop"*`
pub fn fts_query(text: &str, kind: SearchKind) -> Option<String> {
    let column = match kind {
        SearchKind::Track => None,
        SearchKind::Artist => Some("artist"),
        SearchKind::Album => Some("album"),
    };

    let terms: Vec<String> = normalize_text(text)
        .split_whitespace()
        .map(|token| match column {
            Some(col) => format!("{} : \"{}\"*", col, token),
            None => format!("\"{}\"*", token),
        })
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

impl SearchBackend for SqliteCatalog {
    fn search_by_title(
        &self,
        library: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Candidate>, SearchError> {
        self.search_column(library, NormColumn::Title, query, max_results)
    }

    fn search_by_artist(
        &self,
        library: &str,
        artist: &str,
        max_results: usize,
    ) -> Result<Vec<Candidate>, SearchError> {
        self.search_column(library, NormColumn::Artist, artist, max_results)
    }

    fn broad_search(
        &self,
        library: &str,
        query: &str,
        kind: SearchKind,
        max_results: usize,
    ) -> Result<Vec<Candidate>, SearchError> {
        let conn = self.lock_for_search()?;
        ensure_library(&conn, library)?;
        let Some(expr) = fts_query(query, kind) else {
            return Ok(Vec::new());
        };

        let mut stmt = conn.prepare_cached(
            "SELECT t.id, t.title, t.artist, t.album
             FROM tracks_fts fts
             JOIN tracks t ON fts.rowid = t.id
             WHERE tracks_fts MATCH ?1 AND t.library = ?2
             ORDER BY t.id
             LIMIT ?3",
        )?;
        let candidates = stmt
            .query_map(params![expr, library, max_results as i64], row_to_candidate)?
            .collect::<rusqlite::Result<Vec<Candidate>>>()?;

        debug!("FTS {} '{}' -> {} rows", kind.as_str(), expr, candidates.len());
        Ok(candidates)
    }
}

/// Build an in-memory catalog from `(title, artist, album)` rows, FTS included.
#[cfg(test)]
pub(crate) fn in_memory_catalog(
    library: &str,
    rows: &[(&str, &str, Option<&str>)],
) -> Result<SqliteCatalog> {
    let catalog = SqliteCatalog::create_in_memory()?;
    let tracks: Vec<TrackRecord> = rows
        .iter()
        .map(|(title, artist, album)| TrackRecord::new(*title, *artist, *album))
        .collect();
    catalog.insert_tracks(library, &tracks)?;
    catalog.rebuild_fts()?;
    Ok(catalog)
}
