//! SQLite-backed storage.
//!
//! Provides persistent storage for:
//! - The key-value state behind [`KvStore`] (settings, mode, counters)
//! - A history of completed phases, with daily and all-time aggregates

use std::path::Path;

use chrono::{DateTime, Local, TimeZone, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::kv::KvStore;
use crate::error::{CoreError, DatabaseError};
use crate::timer::Phase;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: i64,
    pub phase: Phase,
    pub duration_secs: u64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub work_completed: u64,
    pub relax_completed: u64,
    pub total_work_secs: u64,
    pub total_relax_secs: u64,
}

/// SQLite database for timer state and completion history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/eyerest.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("eyerest.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS completions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                phase         TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                completed_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_completions_completed_at ON completions(completed_at);",
        )?;
        Ok(())
    }

    /// Record a completed phase.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_completion(
        &self,
        phase: Phase,
        duration_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO completions (phase, duration_secs, completed_at) VALUES (?1, ?2, ?3)",
            params![phase.as_str(), duration_secs, completed_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent completions first.
    pub fn recent_completions(&self, limit: usize) -> Result<Vec<CompletionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase, duration_secs, completed_at
             FROM completions
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, phase, duration_secs, completed_at) = row?;
            // Rows written by an unknown future version are skipped.
            let Ok(phase) = phase.parse::<Phase>() else {
                continue;
            };
            let Ok(completed_at) = DateTime::parse_from_rfc3339(&completed_at) else {
                continue;
            };
            records.push(CompletionRecord {
                id,
                phase,
                duration_secs,
                completed_at: completed_at.with_timezone(&Utc),
            });
        }
        Ok(records)
    }

    /// Completions since local midnight.
    pub fn stats_today(&self) -> Result<Stats, rusqlite::Error> {
        self.stats_since(start_of_day(&Local::now()))
    }

    pub fn stats_since(&self, cutoff: DateTime<Utc>) -> Result<Stats, rusqlite::Error> {
        self.aggregate(&cutoff.to_rfc3339())
    }

    pub fn stats_all(&self) -> Result<Stats, rusqlite::Error> {
        self.aggregate("")
    }

    fn aggregate(&self, since: &str) -> Result<Stats, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT phase, COUNT(*), COALESCE(SUM(duration_secs), 0)
             FROM completions
             WHERE completed_at >= ?1
             GROUP BY phase",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        let mut stats = Stats::default();
        for row in rows {
            let (phase, count, secs) = row?;
            stats.total_sessions += count;
            match phase.as_str() {
                "work" => {
                    stats.work_completed += count;
                    stats.total_work_secs += secs;
                }
                "relax" => {
                    stats.relax_completed += count;
                    stats.total_relax_secs += secs;
                }
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Midnight of `now`'s calendar day in its own time zone, as UTC.
fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(chrono::NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|start| start.with_timezone(&Utc))
        // Midnight skipped by a DST jump: fall back to the UTC reading.
        .unwrap_or_else(|| midnight.and_utc())
}

impl KvStore for Database {
    fn get(&self, key: &str) -> crate::error::Result<Option<String>> {
        Ok(self.kv_get(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        Ok(self.kv_set(key, value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_completion(Phase::Work, 1200, now).unwrap();
        db.record_completion(Phase::Relax, 20, now).unwrap();
        db.record_completion(Phase::Work, 1200, now).unwrap();

        let stats = db.stats_all().unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.work_completed, 2);
        assert_eq!(stats.total_work_secs, 2400);
        assert_eq!(stats.relax_completed, 1);
        assert_eq!(stats.total_relax_secs, 20);
        assert_eq!(db.stats_today().unwrap(), stats);
    }

    #[test]
    fn today_excludes_older_rows() {
        let db = Database::open_memory().unwrap();
        let old = Utc::now() - chrono::Duration::days(3);
        db.record_completion(Phase::Work, 60, old).unwrap();
        assert_eq!(db.stats_today().unwrap().total_sessions, 0);
        assert_eq!(db.stats_all().unwrap().total_sessions, 1);
    }

    #[test]
    fn day_starts_at_local_midnight() {
        let tokyo = chrono::FixedOffset::east_opt(9 * 3600).unwrap();
        let now = tokyo.with_ymd_and_hms(2026, 10, 19, 1, 30, 0).unwrap();
        assert_eq!(
            start_of_day(&now),
            Utc.with_ymd_and_hms(2026, 10, 18, 15, 0, 0).unwrap()
        );

        let denver = chrono::FixedOffset::west_opt(6 * 3600).unwrap();
        let now = denver.with_ymd_and_hms(2026, 10, 19, 22, 0, 0).unwrap();
        assert_eq!(
            start_of_day(&now),
            Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn stats_since_uses_the_cutoff_instant() {
        let db = Database::open_memory().unwrap();
        let cutoff = Utc.with_ymd_and_hms(2026, 10, 18, 15, 0, 0).unwrap();
        db.record_completion(Phase::Work, 60, cutoff - chrono::Duration::hours(1))
            .unwrap();
        db.record_completion(Phase::Relax, 20, cutoff + chrono::Duration::hours(1))
            .unwrap();
        let stats = db.stats_since(cutoff).unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.relax_completed, 1);
    }

    #[test]
    fn recent_completions_newest_first() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_completion(Phase::Work, 60, now - chrono::Duration::minutes(5))
            .unwrap();
        db.record_completion(Phase::Relax, 20, now).unwrap();
        let recent = db.recent_completions(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].phase, Phase::Relax);
        assert_eq!(recent[1].duration_secs, 60);
    }

    #[test]
    fn kv_store() {
        let mut db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        KvStore::set(&mut db, "test", "again").unwrap();
        assert_eq!(KvStore::get(&db, "test").unwrap().as_deref(), Some("again"));
    }

    #[test]
    fn open_at_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eyerest.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.kv_set("mode", "automate").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.kv_get("mode").unwrap().as_deref(), Some("automate"));
    }
}
