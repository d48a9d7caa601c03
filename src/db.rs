//! Local SQLite database layer for the Atelier Ledger.
//!
//! Uses rusqlite with WAL mode. Provides schema migrations and managed
//! state shared by the ledger, aggregation, and scheduler modules.
//!
//! The daily ledger is keyed by `(workshop_id, day_key)`: one row per
//! workshop per calendar day in the configured timezone. `day` holds the
//! RFC3339 UTC instant of that day's timezone-local midnight so range
//! queries on instants and bucketing on day keys always agree.

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::error::{LedgerError, Result};

/// Shared state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

impl DbState {
    /// Lock the connection, mapping a poisoned mutex to a store error.
    pub fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LedgerError::Store(format!("connection lock poisoned: {e}")))
    }
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Initialize the database at `{data_dir}/ledger.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(data_dir: &Path) -> Result<DbState> {
    fs::create_dir_all(data_dir).map_err(|e| LedgerError::Store(format!("create data dir: {e}")))?;

    let db_path = data_dir.join("ledger.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!("Database open failed ({first_err}), deleting and retrying once");
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                // Also remove WAL/SHM files if present
                let wal = db_path.with_extension("db-wal");
                let shm = db_path.with_extension("db-shm");
                let _ = fs::remove_file(&wal);
                let _ = fs::remove_file(&shm);
            }
            open_and_configure(&db_path)
                .map_err(|e| LedgerError::Store(format!("open after retry: {e}")))?
        }
    };

    run_migrations(&conn)?;

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection> {
    let conn =
        Connection::open(path).map_err(|e| LedgerError::Store(format!("sqlite open: {e}")))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| LedgerError::Store(format!("pragma setup: {e}")))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<()> {
    // Ensure schema_version table exists first
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| LedgerError::Store(format!("create schema_version: {e}")))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Migration v1: workshop roster and daily ledger entries.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- workshops (roster)
        CREATE TABLE IF NOT EXISTS workshops (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- daily ledger entries: one row per (workshop, day_key)
        CREATE TABLE IF NOT EXISTS daily_entries (
            id TEXT PRIMARY KEY,
            workshop_id TEXT NOT NULL REFERENCES workshops(id),
            day TEXT NOT NULL,
            day_key TEXT NOT NULL,
            orders_count INTEGER NOT NULL DEFAULT 0 CHECK (orders_count >= 0),
            day_debt REAL NOT NULL DEFAULT 0 CHECK (day_debt >= 0),
            day_paid REAL NOT NULL DEFAULT 0 CHECK (day_paid >= 0),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(workshop_id, day_key)
        );

        CREATE INDEX IF NOT EXISTS idx_daily_entries_day ON daily_entries(day);
        CREATE INDEX IF NOT EXISTS idx_daily_entries_day_key ON daily_entries(day_key);
        CREATE INDEX IF NOT EXISTS idx_daily_entries_workshop ON daily_entries(workshop_id);

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| LedgerError::Store(format!("migration v1: {e}")))?;

    Ok(())
}

/// Migration v2: free-text note on daily entries.
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        ALTER TABLE daily_entries ADD COLUMN note TEXT;

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| LedgerError::Store(format!("migration v2: {e}")))?;

    Ok(())
}

/// Run migrations for tests (in-memory databases).
pub fn run_migrations_for_test(conn: &Connection) {
    run_migrations(conn).expect("run_migrations should succeed in test");
}

// ===========================================================================
// Tests
// ===========================================================================
