//! SQLite Storage Implementation
//!
//! Persistent schedule store. Records live in `schedule_records`; their
//! performance history lives in `review_log`, one row per observation.
//! `seq` grows monotonically per key, so a review appends one row and
//! retention trimming deletes a prefix.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, Params, TransactionBehavior};

use super::{Result, ScheduleStore, StorageError};
use crate::schedule::{PerformanceEntry, ScheduleKey, ScheduleRecord};
use crate::sm2::Quality;

const HISTORY_FOR_KEY: &str = "SELECT concept_id, quality, reviewed_at, response_time_ms
     FROM review_log
     WHERE user_id = ?1 AND concept_id = ?2
     ORDER BY seq ASC";

const HISTORY_FOR_USER: &str = "SELECT concept_id, quality, reviewed_at, response_time_ms
     FROM review_log
     WHERE user_id = ?1
     ORDER BY concept_id ASC, seq ASC";

const HISTORY_FOR_DUE: &str = "SELECT l.concept_id, l.quality, l.reviewed_at, l.response_time_ms
     FROM review_log l
     JOIN schedule_records r ON r.user_id = l.user_id AND r.concept_id = l.concept_id
     WHERE l.user_id = ?1 AND r.next_review <= ?2
     ORDER BY l.concept_id ASC, l.seq ASC";

// ============================================================================
// STORAGE
// ============================================================================

/// SQLite-backed schedule store
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, making the store `Send + Sync` so the engine
/// can share it as `Arc<SqliteStore>`.
///
/// Timestamps are persisted at millisecond precision.
pub struct SqliteStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("CADENCE_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Platform data directory location of the default database
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "cadence", "core").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            if let Err(e) = std::fs::set_permissions(data_dir, perms) {
                tracing::warn!("Could not restrict permissions on {}: {}", data_dir.display(), e);
            }
        }
        Ok(data_dir.join("cadence.db"))
    }

    /// Open (or create) the store at `db_path`, or at [`Self::default_path`]
    pub fn open(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Open writer connection
        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;

        // Open reader connection to same path
        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        tracing::info!(
            path = %path.display(),
            migrations_applied = applied,
            "Schedule store opened"
        );

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current schema version
    pub fn schema_version(&self) -> Result<u32> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Lock("Reader lock poisoned".into()))?;
        Ok(super::migrations::get_current_version(&reader)?)
    }

    /// Total number of schedule records
    pub fn count(&self) -> Result<i64> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Lock("Reader lock poisoned".into()))?;
        let total: i64 =
            reader.query_row("SELECT COUNT(*) FROM schedule_records", [], |row| row.get(0))?;
        Ok(total)
    }

    /// Remove a record and its history
    ///
    /// The engine itself never deletes; this exists for external retention
    /// policy such as retiring a concept.
    pub fn delete(&self, key: &ScheduleKey) -> Result<bool> {
        let writer = self.writer.lock()
            .map_err(|_| StorageError::Lock("Writer lock poisoned".into()))?;
        let rows = writer.execute(
            "DELETE FROM schedule_records WHERE user_id = ?1 AND concept_id = ?2",
            params![key.user_id, key.concept_id],
        )?;
        Ok(rows > 0)
    }

    /// Write a consistent copy of the database to `path`
    pub fn backup_to(&self, path: &Path) -> Result<()> {
        let path_str = path.to_str().ok_or_else(|| {
            StorageError::Init("Invalid backup path encoding".to_string())
        })?;
        if path_str.bytes().any(|b| b < 0x20 && b != b'\t') {
            return Err(StorageError::Init("Backup path contains invalid characters".to_string()));
        }
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Lock("Reader lock poisoned".into()))?;
        // VACUUM INTO doesn't support parameterized queries; escape single quotes
        reader.execute_batch(&format!("VACUUM INTO '{}'", path_str.replace('\'', "''")))?;
        Ok(())
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    fn format_timestamp(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Parse RFC3339 timestamp
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(StorageError::InvalidTimestamp(format!(
                        "{} '{}': {}",
                        field_name, value, e
                    ))),
                )
            })
    }

    /// Convert a row to ScheduleRecord (history attached separately)
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ScheduleRecord> {
        let next_review: String = row.get("next_review")?;
        let last_review: Option<String> = row.get("last_review")?;

        Ok(ScheduleRecord {
            user_id: row.get("user_id")?,
            concept_id: row.get("concept_id")?,
            ease_factor: row.get("ease_factor")?,
            interval: row.get("interval_days")?,
            repetitions: row.get("repetitions")?,
            next_review: Self::parse_timestamp(&next_review, "next_review")?,
            last_review: last_review
                .map(|s| Self::parse_timestamp(&s, "last_review"))
                .transpose()?,
            performance_history: Vec::new(),
        })
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<(String, PerformanceEntry)> {
        let concept_id: String = row.get("concept_id")?;
        let quality: i64 = row.get("quality")?;
        let reviewed_at: String = row.get("reviewed_at")?;
        let response_time_ms: Option<i64> = row.get("response_time_ms")?;

        Ok((
            concept_id,
            PerformanceEntry {
                quality: Quality::new(quality),
                timestamp: Self::parse_timestamp(&reviewed_at, "reviewed_at")?,
                response_time_ms: response_time_ms.and_then(|ms| u64::try_from(ms).ok()),
            },
        ))
    }

    /// Load history rows grouped by concept, each group in append order
    fn load_history<P: Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> rusqlite::Result<HashMap<String, Vec<PerformanceEntry>>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, |row| Self::row_to_entry(row))?;

        let mut grouped: HashMap<String, Vec<PerformanceEntry>> = HashMap::new();
        for row in rows {
            let (concept_id, entry) = row?;
            grouped.entry(concept_id).or_default().push(entry);
        }
        Ok(grouped)
    }

    fn read_record(conn: &Connection, key: &ScheduleKey) -> rusqlite::Result<Option<ScheduleRecord>> {
        let record = conn
            .query_row(
                "SELECT * FROM schedule_records WHERE user_id = ?1 AND concept_id = ?2",
                params![key.user_id, key.concept_id],
                |row| Self::row_to_record(row),
            )
            .optional()?;

        let Some(mut record) = record else {
            return Ok(None);
        };

        let history = Self::load_history(
            conn,
            HISTORY_FOR_KEY,
            params![key.user_id, key.concept_id],
        )?;
        Self::attach_history(std::slice::from_mut(&mut record), history);

        Ok(Some(record))
    }

    fn upsert_record(conn: &Connection, record: &ScheduleRecord) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO schedule_records (
                user_id, concept_id, ease_factor, interval_days, repetitions,
                next_review, last_review, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(user_id, concept_id) DO UPDATE SET
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                next_review = excluded.next_review,
                last_review = excluded.last_review,
                updated_at = excluded.updated_at",
            params![
                record.user_id,
                record.concept_id,
                record.ease_factor,
                record.interval,
                record.repetitions,
                Self::format_timestamp(&record.next_review),
                record.last_review.as_ref().map(Self::format_timestamp),
                Self::format_timestamp(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn insert_history(
        conn: &Connection,
        record: &ScheduleRecord,
        entries: &[PerformanceEntry],
        first_seq: i64,
    ) -> rusqlite::Result<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO review_log (
                user_id, concept_id, seq, quality, reviewed_at, response_time_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (offset, entry) in entries.iter().enumerate() {
            stmt.execute(params![
                record.user_id,
                record.concept_id,
                first_seq + offset as i64,
                entry.quality.value(),
                Self::format_timestamp(&entry.timestamp),
                entry
                    .response_time_ms
                    .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)),
            ])?;
        }
        Ok(())
    }

    /// Replace every history row of the record
    fn rewrite_history(conn: &Connection, record: &ScheduleRecord) -> rusqlite::Result<()> {
        conn.execute(
            "DELETE FROM review_log WHERE user_id = ?1 AND concept_id = ?2",
            params![record.user_id, record.concept_id],
        )?;
        Self::insert_history(conn, record, &record.performance_history, 0)
    }

    /// Bring the stored history from `previous` to the record's history by
    /// deleting the dropped prefix and appending the new tail
    fn sync_history(
        conn: &Connection,
        record: &ScheduleRecord,
        previous: &[PerformanceEntry],
    ) -> rusqlite::Result<()> {
        let history = &record.performance_history;
        // Smallest prefix of `previous` whose removal leaves a prefix of `history`;
        // dropping all of it always qualifies
        let dropped = (0..=previous.len())
            .find(|&n| history.starts_with(&previous[n..]))
            .unwrap_or(previous.len());
        let kept = previous.len() - dropped;

        let max_seq: Option<i64> = conn.query_row(
            "SELECT MAX(seq) FROM review_log WHERE user_id = ?1 AND concept_id = ?2",
            params![record.user_id, record.concept_id],
            |row| row.get(0),
        )?;

        if dropped > 0 {
            conn.execute(
                "DELETE FROM review_log
                 WHERE user_id = ?1 AND concept_id = ?2 AND seq IN (
                     SELECT seq FROM review_log
                     WHERE user_id = ?1 AND concept_id = ?2
                     ORDER BY seq ASC
                     LIMIT ?3
                 )",
                params![record.user_id, record.concept_id, dropped as i64],
            )?;
        }

        let next_seq = max_seq.map_or(0, |seq| seq + 1);
        Self::insert_history(conn, record, &history[kept..], next_seq)
    }

    fn attach_history(
        records: &mut [ScheduleRecord],
        mut history: HashMap<String, Vec<PerformanceEntry>>,
    ) {
        for record in records.iter_mut() {
            if let Some(entries) = history.remove(&record.concept_id) {
                record.performance_history = entries;
            }
        }
    }
}

impl ScheduleStore for SqliteStore {
    fn get(&self, key: &ScheduleKey) -> Result<Option<ScheduleRecord>> {
        let mut reader = self.reader.lock()
            .map_err(|_| StorageError::Lock("Reader lock poisoned".into()))?;
        // One read transaction so the record and its history come from the same snapshot
        let tx = reader.transaction()?;
        Ok(Self::read_record(&tx, key)?)
    }

    fn put(&self, record: &ScheduleRecord) -> Result<()> {
        let mut writer = self.writer.lock()
            .map_err(|_| StorageError::Lock("Writer lock poisoned".into()))?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        Self::upsert_record(&tx, record)?;
        Self::rewrite_history(&tx, record)?;

        tx.commit()?;
        Ok(())
    }

    fn update(
        &self,
        key: &ScheduleKey,
        apply: &mut dyn FnMut(Option<ScheduleRecord>) -> ScheduleRecord,
    ) -> Result<ScheduleRecord> {
        let mut writer = self.writer.lock()
            .map_err(|_| StorageError::Lock("Writer lock poisoned".into()))?;
        // IMMEDIATE takes the write lock up front, so other connections to the
        // same file (including other processes) wait instead of interleaving
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = Self::read_record(&tx, key)?;
        let previous = current
            .as_ref()
            .map(|record| record.performance_history.clone())
            .unwrap_or_default();

        let record = apply(current);
        Self::upsert_record(&tx, &record)?;
        Self::sync_history(&tx, &record, &previous)?;

        tx.commit()?;
        Ok(record)
    }

    fn scan_by_user(&self, user_id: &str) -> Result<Vec<ScheduleRecord>> {
        let mut reader = self.reader.lock()
            .map_err(|_| StorageError::Lock("Reader lock poisoned".into()))?;
        let tx = reader.transaction()?;

        let mut records = {
            let mut stmt = tx.prepare_cached("SELECT * FROM schedule_records WHERE user_id = ?1")?;
            let rows = stmt.query_map(params![user_id], |row| Self::row_to_record(row))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let history = Self::load_history(&tx, HISTORY_FOR_USER, params![user_id])?;
        Self::attach_history(&mut records, history);

        Ok(records)
    }

    fn due_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ScheduleRecord>> {
        let now = Self::format_timestamp(&now);

        let mut reader = self.reader.lock()
            .map_err(|_| StorageError::Lock("Reader lock poisoned".into()))?;
        let tx = reader.transaction()?;

        let mut records = {
            let mut stmt = tx.prepare_cached(
                "SELECT * FROM schedule_records
                 WHERE user_id = ?1 AND next_review <= ?2
                 ORDER BY next_review ASC, concept_id ASC",
            )?;
            let rows = stmt.query_map(params![user_id, now], |row| Self::row_to_record(row))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let history = Self::load_history(&tx, HISTORY_FOR_DUE, params![user_id, now])?;
        Self::attach_history(&mut records, history);

        Ok(records)
    }
}

// ============================================================================
// TESTS
// ============================================================================
