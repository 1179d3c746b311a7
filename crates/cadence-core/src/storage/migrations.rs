//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: schedule records keyed by (user, concept)",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Append-only review log for performance history",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS schedule_records (
    user_id TEXT NOT NULL,
    concept_id TEXT NOT NULL,

    -- SM-2 state
    ease_factor REAL NOT NULL DEFAULT 2.5,
    interval_days INTEGER NOT NULL DEFAULT 0,
    repetitions INTEGER NOT NULL DEFAULT 0,

    -- Scheduling (RFC 3339, millisecond precision, UTC)
    next_review TEXT NOT NULL,
    last_review TEXT,
    updated_at TEXT NOT NULL,

    PRIMARY KEY (user_id, concept_id)
);

-- Due queries are always per user, ordered by next_review
CREATE INDEX IF NOT EXISTS idx_schedule_user_due ON schedule_records(user_id, next_review);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Performance history moves to its own table
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS review_log (
    user_id TEXT NOT NULL,
    concept_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    quality INTEGER NOT NULL,
    reviewed_at TEXT NOT NULL,
    response_time_ms INTEGER,

    PRIMARY KEY (user_id, concept_id, seq),
    FOREIGN KEY (user_id, concept_id)
        REFERENCES schedule_records(user_id, concept_id) ON DELETE CASCADE
);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            // execute_batch handles the multi-statement scripts
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
