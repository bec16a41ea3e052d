//! SQLite-based fast history and key-value storage.
//!
//! Provides persistent storage for:
//! - Finished fasts (stopped early or acknowledged after completion)
//! - Fasting statistics
//! - Key-value store for the running fast

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::kv::KeyValueStore;
use crate::error::{CoreError, DatabaseError};
use crate::events::Event;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastRecord {
    pub id: i64,
    pub hours: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_min: u64,
    /// Whether the fast reached its target.
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Stats {
    pub total_fasts: u64,
    pub completed_fasts: u64,
    pub longest_completed_hours: u32,
    pub total_fasted_min: u64,
}

/// SQLite database for fast storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/fastrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened
    /// or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("fastrack.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS fasts (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    hours       INTEGER NOT NULL,
                    started_at  TEXT NOT NULL,
                    ended_at    TEXT NOT NULL,
                    elapsed_min INTEGER NOT NULL,
                    completed   INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_fasts_started_at ON fasts(started_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Record a finished fast.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_fast(
        &self,
        hours: u32,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        elapsed_min: u64,
        completed: bool,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO fasts (hours, started_at, ended_at, elapsed_min, completed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                hours,
                started_at.to_rfc3339(),
                ended_at.to_rfc3339(),
                elapsed_min,
                completed,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record the fast an event finished, if it finished one.
    ///
    /// A fast that reached its target is booked at exactly its target length,
    /// however long it sat unacknowledged.
    pub fn record_event(&self, event: &Event) -> Result<Option<i64>, DatabaseError> {
        let id = match *event {
            Event::FastStopped {
                hours,
                start_time,
                reached_target: true,
                at,
                ..
            }
            | Event::FastReset {
                hours,
                start_time,
                at,
            } => {
                let ended_at = start_time
                    .checked_add_signed(Duration::hours(i64::from(hours)))
                    .unwrap_or(at);
                self.record_fast(
                    hours,
                    start_time,
                    ended_at,
                    u64::from(hours) * 60,
                    true,
                )?
            }
            Event::FastStopped {
                hours,
                start_time,
                elapsed_ms,
                at,
                ..
            } => self.record_fast(hours, start_time, at, elapsed_ms / 60_000, false)?,
            _ => return Ok(None),
        };
        Ok(Some(id))
    }

    /// Most recent fasts first.
    pub fn history(&self, limit: usize) -> Result<Vec<FastRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, hours, started_at, ended_at, elapsed_min, completed
             FROM fasts
             ORDER BY started_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, hours, started_at, ended_at, elapsed_min, completed) = row?;
            records.push(FastRecord {
                id,
                hours,
                started_at: parse_timestamp(&started_at)?,
                ended_at: parse_timestamp(&ended_at)?,
                elapsed_min,
                completed,
            });
        }
        Ok(records)
    }

    pub fn stats(&self) -> Result<Stats, DatabaseError> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(completed), 0),
                    COALESCE(MAX(CASE WHEN completed THEN hours END), 0),
                    COALESCE(SUM(elapsed_min), 0)
             FROM fasts",
            [],
            |row| {
                Ok(Stats {
                    total_fasts: row.get(0)?,
                    completed_fasts: row.get(1)?,
                    longest_completed_hours: row.get(2)?,
                    total_fasted_min: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a value from the kv store. Missing keys are fine.
    pub fn kv_remove(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        self.kv_get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.kv_set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), DatabaseError> {
        self.kv_remove(key)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 19, 30, 0).unwrap()
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        db.record_fast(16, t0(), t0() + Duration::hours(16), 960, true)
            .unwrap();
        db.record_fast(
            18,
            t0() + Duration::days(1),
            t0() + Duration::days(1) + Duration::hours(3),
            180,
            false,
        )
        .unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_fasts, 2);
        assert_eq!(stats.completed_fasts, 1);
        assert_eq!(stats.longest_completed_hours, 16);
        assert_eq!(stats.total_fasted_min, 1140);

        let history = db.history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].hours, 18);
        assert_eq!(history[1].started_at, t0());
    }

    #[test]
    fn empty_stats_are_zero() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.stats().unwrap(), Stats::default());
    }

    #[test]
    fn record_event_books_completed_fast_at_target_length() {
        let db = Database::open_memory().unwrap();
        let reset = Event::FastReset {
            hours: 14,
            start_time: t0(),
            at: t0() + Duration::days(3),
        };
        assert!(db.record_event(&reset).unwrap().is_some());

        let record = &db.history(1).unwrap()[0];
        assert!(record.completed);
        assert_eq!(record.elapsed_min, 14 * 60);
        assert_eq!(record.ended_at, t0() + Duration::hours(14));
    }

    #[test]
    fn record_event_target_past_calendar_ends_at_event_time() {
        let db = Database::open_memory().unwrap();
        let start = DateTime::<Utc>::MAX_UTC - Duration::hours(1);
        let reset = Event::FastReset {
            hours: u32::MAX,
            start_time: start,
            at: start,
        };
        assert!(db.record_event(&reset).unwrap().is_some());
        assert_eq!(db.stats().unwrap().completed_fasts, 1);
    }

    #[test]
    fn record_event_books_early_stop_at_elapsed() {
        let db = Database::open_memory().unwrap();
        let stop = Event::FastStopped {
            hours: 16,
            start_time: t0(),
            elapsed_ms: 95 * 60_000 + 30_000,
            reached_target: false,
            at: t0() + Duration::minutes(95),
        };
        db.record_event(&stop).unwrap();

        let record = &db.history(1).unwrap()[0];
        assert!(!record.completed);
        assert_eq!(record.elapsed_min, 95);
    }

    #[test]
    fn record_event_ignores_other_events() {
        let db = Database::open_memory().unwrap();
        let event = Event::PresetSelected { hours: 12, at: t0() };
        assert!(db.record_event(&event).unwrap().is_none());
        assert_eq!(db.stats().unwrap().total_fasts, 0);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_remove("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_remove("test").unwrap();
    }
}
