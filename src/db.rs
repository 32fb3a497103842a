// 🗄️ Boundary Cache - SQLite + WAL
// Last good county geometry per source, so a failed download can fall back.

use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::warn;

/// A cached geometry body with provenance
#[derive(Debug, Clone, PartialEq)]
pub struct CachedBoundary {
    pub source: String,
    pub sha256: String,
    pub fetched_at: DateTime<Utc>,
    pub body: Vec<u8>,
}

pub fn checksum(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS boundary_cache (
            source TEXT PRIMARY KEY,
            sha256 TEXT NOT NULL,
            fetched_at TEXT NOT NULL,
            body BLOB NOT NULL
        )",
        [],
    )?;

    Ok(())
}

pub struct BoundaryCache {
    conn: Connection,
}

impl BoundaryCache {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        Ok(BoundaryCache { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(BoundaryCache { conn })
    }

    /// Store (or replace) the body fetched from `source`
    pub fn store(&self, source: &str, body: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO boundary_cache (source, sha256, fetched_at, body)
             VALUES (?1, ?2, ?3, ?4)",
            params![source, checksum(body), Utc::now().to_rfc3339(), body],
        )?;
        Ok(())
    }

    /// Cached body for `source`. Entries failing their checksum are ignored.
    pub fn load(&self, source: &str) -> Result<Option<CachedBoundary>> {
        let row = self
            .conn
            .query_row(
                "SELECT source, sha256, fetched_at, body FROM boundary_cache WHERE source = ?1",
                params![source],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((source, sha256, fetched_at, body)) = row else {
            return Ok(None);
        };

        if checksum(&body) != sha256 {
            warn!(source = %source, "cached boundary failed checksum, ignoring");
            return Ok(None);
        }

        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH);

        Ok(Some(CachedBoundary {
            source,
            sha256,
            fetched_at,
            body,
        }))
    }

    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM boundary_cache", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load() {
        let cache = BoundaryCache::open_in_memory().unwrap();
        cache.store("https://example.test/counties.json", b"{\"features\":[]}").unwrap();

        let cached = cache.load("https://example.test/counties.json").unwrap().unwrap();
        assert_eq!(cached.body, b"{\"features\":[]}".to_vec());
        assert_eq!(cached.sha256, checksum(b"{\"features\":[]}"));
        assert!(cached.fetched_at <= Utc::now());
        assert!(cache.load("other").unwrap().is_none());
    }

    #[test]
    fn test_store_replaces_previous_body() {
        let cache = BoundaryCache::open_in_memory().unwrap();
        cache.store("src", b"old").unwrap();
        cache.store("src", b"new").unwrap();

        assert_eq!(cache.count().unwrap(), 1);
        assert_eq!(cache.load("src").unwrap().unwrap().body, b"new".to_vec());
    }

    #[test]
    fn test_corrupt_entry_ignored() {
        let cache = BoundaryCache::open_in_memory().unwrap();
        cache.store("src", b"body").unwrap();
        cache
            .conn
            .execute("UPDATE boundary_cache SET body = ?1 WHERE source = 'src'", params![b"tampered".to_vec()])
            .unwrap();

        assert!(cache.load("src").unwrap().is_none());
    }

    #[test]
    fn test_cache_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boundaries.db");
        BoundaryCache::open(&path).unwrap().store("src", b"geo").unwrap();

        let reopened = BoundaryCache::open(&path).unwrap();
        assert_eq!(reopened.load("src").unwrap().unwrap().body, b"geo".to_vec());
    }
}
