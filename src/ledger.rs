//! Daily ledger entry management for the Atelier Ledger.
//!
//! One entry per (workshop, dayKey) records a workshop's financial activity
//! for one calendar day in the configured timezone: orders taken, debt
//! incurred, and amounts paid. `dayPaid` recorded on a day may pay down debt
//! incurred on earlier days; the outstanding balance is always derived from
//! sums, never stored.
//!
//! Writes validate non-negative amounts before touching the store. Upserts
//! replace the existing row for the same day; payment recording increments
//! `day_paid` in a single statement so concurrent payments never lose
//! updates.

use chrono::Utc;
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::calendar;
use crate::config::Config;
use crate::db::DbState;
use crate::error::{LedgerError, Result};
use crate::workshops::{self, WorkshopFilter};

const NOTE_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyEntry {
    pub id: String,
    pub workshop_id: String,
    /// RFC3339 UTC instant of the day's timezone-local midnight.
    pub day: String,
    /// Canonical `YYYY-MM-DD` in the configured timezone, the dedup key.
    pub day_key: String,
    pub orders_count: i64,
    pub day_debt: f64,
    pub day_paid: f64,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Full entry payload for upserts (replace semantics on conflict).
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    pub orders_count: i64,
    pub day_debt: f64,
    pub day_paid: f64,
    pub note: Option<String>,
}

/// Partial entry payload for patch updates: only provided fields change.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub orders_count: Option<i64>,
    pub day_debt: Option<f64>,
    pub day_paid: Option<f64>,
    /// `None` leaves the stored note unchanged; an empty or blank string
    /// clears it.
    pub note: Option<String>,
}

fn validate_amount(label: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(LedgerError::validation(format!(
            "{label} must be a non-negative amount, got {value}"
        )));
    }
    Ok(())
}

fn validate_count(label: &str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(LedgerError::validation(format!(
            "{label} must be >= 0, got {value}"
        )));
    }
    Ok(())
}

fn validate_note(note: Option<&str>) -> Result<()> {
    if let Some(n) = note {
        if n.chars().count() > NOTE_MAX_LEN {
            return Err(LedgerError::validation(format!(
                "note exceeds {NOTE_MAX_LEN} characters"
            )));
        }
    }
    Ok(())
}

fn ensure_workshop(conn: &Connection, workshop_id: &str) -> Result<()> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT id FROM workshops WHERE id = ?1",
            params![workshop_id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(LedgerError::not_found(format!("workshop: {workshop_id}")));
    }
    Ok(())
}

/// Canonical `YYYY-MM-DD` form of a caller-supplied day key.
///
/// chrono accepts unpadded input like `2024-5-4`; storing keys verbatim
/// would split one calendar day across rows and miss every report bucket,
/// so every entry-addressing path normalizes through here first.
fn canonical_day_key(day_key: &str) -> Result<String> {
    Ok(calendar::day_key(calendar::parse_day_key(day_key)?))
}

/// UTC instant string for a day key's local midnight.
fn day_instant(tz: Tz, day_key: &str) -> Result<String> {
    let date = calendar::parse_day_key(day_key)?;
    Ok(calendar::start_of_day(tz, date)
        .with_timezone(&Utc)
        .to_rfc3339())
}

// ---------------------------------------------------------------------------
// Upsert / update
// ---------------------------------------------------------------------------

/// Create or fully replace the entry for (workshop, dayKey).
///
/// Replace semantics: re-running the upsert for the same day overwrites the
/// previous values rather than duplicating or accumulating.
pub fn upsert_entry(
    db: &DbState,
    config: &Config,
    workshop_id: &str,
    day_key: &str,
    draft: &EntryDraft,
) -> Result<DailyEntry> {
    validate_count("ordersCount", draft.orders_count)?;
    validate_amount("dayDebt", draft.day_debt)?;
    validate_amount("dayPaid", draft.day_paid)?;
    validate_note(draft.note.as_deref())?;
    let day_key = canonical_day_key(day_key)?;
    let day = day_instant(config.timezone, &day_key)?;

    let conn = db.lock()?;
    ensure_workshop(&conn, workshop_id)?;

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO daily_entries (
            id, workshop_id, day, day_key, orders_count, day_debt, day_paid,
            note, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        ON CONFLICT(workshop_id, day_key) DO UPDATE SET
            day = excluded.day,
            orders_count = excluded.orders_count,
            day_debt = excluded.day_debt,
            day_paid = excluded.day_paid,
            note = excluded.note,
            updated_at = excluded.updated_at",
        params![
            Uuid::new_v4().to_string(),
            workshop_id,
            day,
            day_key,
            draft.orders_count,
            draft.day_debt,
            draft.day_paid,
            draft.note,
            now,
        ],
    )?;

    info!(workshop_id = %workshop_id, day_key = %day_key, "Daily entry upserted");

    get_entry_on(&conn, workshop_id, &day_key)
}

/// Patch the entry for (workshop, dayKey); only provided fields change.
pub fn update_entry(
    db: &DbState,
    workshop_id: &str,
    day_key: &str,
    patch: &EntryPatch,
) -> Result<DailyEntry> {
    if let Some(c) = patch.orders_count {
        validate_count("ordersCount", c)?;
    }
    if let Some(d) = patch.day_debt {
        validate_amount("dayDebt", d)?;
    }
    if let Some(p) = patch.day_paid {
        validate_amount("dayPaid", p)?;
    }
    validate_note(patch.note.as_deref())?;
    let day_key = canonical_day_key(day_key)?;

    // COALESCE cannot distinguish "not provided" from "clear", so the note
    // takes a provided/value pair: a blank provided note stores NULL.
    let (note_provided, note_value) = match patch.note.as_deref() {
        None => (false, None),
        Some(s) if s.trim().is_empty() => (true, None),
        Some(s) => (true, Some(s.to_string())),
    };

    let conn = db.lock()?;
    ensure_workshop(&conn, workshop_id)?;

    let now = Utc::now().to_rfc3339();
    let changed = conn.execute(
        "UPDATE daily_entries SET
            orders_count = COALESCE(?1, orders_count),
            day_debt = COALESCE(?2, day_debt),
            day_paid = COALESCE(?3, day_paid),
            note = CASE WHEN ?4 THEN ?5 ELSE note END,
            updated_at = ?6
         WHERE workshop_id = ?7 AND day_key = ?8",
        params![
            patch.orders_count,
            patch.day_debt,
            patch.day_paid,
            note_provided,
            note_value,
            now,
            workshop_id,
            day_key,
        ],
    )?;
    if changed == 0 {
        return Err(LedgerError::not_found(format!(
            "daily entry: {workshop_id}/{day_key}"
        )));
    }

    get_entry_on(&conn, workshop_id, &day_key)
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Record a payment against a workshop's day (today when `day_key` is None).
///
/// A zero-debt entry is created for the day if none exists; otherwise the
/// existing entry's `day_paid` is incremented. The increment happens in one
/// statement, so concurrent payments to the same day all land.
pub fn record_payment(
    db: &DbState,
    config: &Config,
    workshop_id: &str,
    day_key: Option<&str>,
    amount: f64,
    note: Option<&str>,
) -> Result<DailyEntry> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::validation(format!(
            "payment amount must be positive, got {amount}"
        )));
    }
    validate_note(note)?;

    let key = match day_key {
        Some(k) => canonical_day_key(k)?,
        None => calendar::day_key(calendar::today(config.timezone)),
    };
    let day = day_instant(config.timezone, &key)?;

    let conn = db.lock()?;
    ensure_workshop(&conn, workshop_id)?;

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO daily_entries (
            id, workshop_id, day, day_key, orders_count, day_debt, day_paid,
            note, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?6, ?7, ?7)
        ON CONFLICT(workshop_id, day_key) DO UPDATE SET
            day_paid = day_paid + excluded.day_paid,
            note = COALESCE(excluded.note, note),
            updated_at = excluded.updated_at",
        params![
            Uuid::new_v4().to_string(),
            workshop_id,
            day,
            key,
            amount,
            note,
            now,
        ],
    )?;

    info!(workshop_id = %workshop_id, day_key = %key, amount = %amount, "Payment recorded");

    get_entry_on(&conn, workshop_id, &key)
}

// ---------------------------------------------------------------------------
// Bot write paths (by workshop name)
// ---------------------------------------------------------------------------

/// Upsert a daily entry addressed by workshop name instead of id.
///
/// An unknown name creates the workshop when auto-create is allowed (the
/// per-call flag or the config default), otherwise fails as not-found.
pub fn upsert_entry_by_name(
    db: &DbState,
    config: &Config,
    workshop_name: &str,
    day_key: &str,
    draft: &EntryDraft,
    allow_auto_create: Option<bool>,
) -> Result<DailyEntry> {
    let allow = allow_auto_create.unwrap_or(false) || config.allow_auto_create_workshops;
    let workshop = {
        let conn = db.lock()?;
        workshops::resolve_or_create(&conn, workshop_name, allow)?
    };
    upsert_entry(db, config, &workshop.id, day_key, draft)
}

/// Record a payment addressed by workshop name, against today's entry.
pub fn record_payment_by_name(
    db: &DbState,
    config: &Config,
    workshop_name: &str,
    amount: f64,
    note: Option<&str>,
    allow_auto_create: Option<bool>,
) -> Result<DailyEntry> {
    let allow = allow_auto_create.unwrap_or(false) || config.allow_auto_create_workshops;
    let workshop = {
        let conn = db.lock()?;
        workshops::resolve_or_create(&conn, workshop_name, allow)?
    };
    record_payment(db, config, &workshop.id, None, amount, note)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Fetch one entry by (workshop, dayKey).
pub fn get_entry(db: &DbState, workshop_id: &str, day_key: &str) -> Result<DailyEntry> {
    let day_key = canonical_day_key(day_key)?;
    let conn = db.lock()?;
    get_entry_on(&conn, workshop_id, &day_key)
}

fn get_entry_on(conn: &Connection, workshop_id: &str, day_key: &str) -> Result<DailyEntry> {
    conn.query_row(
        "SELECT id, workshop_id, day, day_key, orders_count, day_debt, day_paid,
                note, created_at, updated_at
         FROM daily_entries WHERE workshop_id = ?1 AND day_key = ?2",
        params![workshop_id, day_key],
        entry_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found(format!("daily entry: {workshop_id}/{day_key}")))
}

/// List a workshop's entries, optionally bounded by from/to day keys
/// (inclusive), ordered by day.
pub fn list_entries(
    db: &DbState,
    workshop_id: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<DailyEntry>> {
    let from = from.map(calendar::parse_day_key).transpose()?;
    let to = to.map(calendar::parse_day_key).transpose()?;

    let conn = db.lock()?;
    ensure_workshop(&conn, workshop_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, workshop_id, day, day_key, orders_count, day_debt, day_paid,
                note, created_at, updated_at
         FROM daily_entries
         WHERE workshop_id = ?1
           AND (?2 IS NULL OR day_key >= ?2)
           AND (?3 IS NULL OR day_key <= ?3)
         ORDER BY day_key ASC",
    )?;
    let rows = stmt.query_map(
        params![
            workshop_id,
            from.map(calendar::day_key),
            to.map(calendar::day_key)
        ],
        entry_from_row,
    )?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

/// Lean row shape consumed by the aggregation engine.
#[derive(Debug, Clone)]
pub(crate) struct EntryRow {
    pub workshop_id: String,
    pub day_key: String,
    pub orders_count: i64,
    pub day_debt: f64,
    pub day_paid: f64,
    pub note: Option<String>,
}

/// Entries whose day instant falls within [start, end] inclusive, optionally
/// narrowed to one workshop.
pub(crate) fn find_entries_in_range(
    conn: &Connection,
    filter: &WorkshopFilter,
    start_utc: &str,
    end_utc: &str,
) -> Result<Vec<EntryRow>> {
    let mut stmt = conn.prepare(
        "SELECT e.workshop_id, e.day_key, e.orders_count, e.day_debt, e.day_paid, e.note
         FROM daily_entries e
         JOIN workshops w ON w.id = e.workshop_id
         WHERE e.day >= ?1 AND e.day <= ?2
           AND (?3 IS NULL OR e.workshop_id = ?3)
           AND (?4 IS NULL OR w.name = ?4)
         ORDER BY e.day_key ASC",
    )?;
    let rows = stmt.query_map(
        params![start_utc, end_utc, filter.id, filter.name],
        |row| {
            Ok(EntryRow {
                workshop_id: row.get(0)?,
                day_key: row.get(1)?,
                orders_count: row.get(2)?,
                day_debt: row.get(3)?,
                day_paid: row.get(4)?,
                note: row.get(5)?,
            })
        },
    )?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyEntry> {
    Ok(DailyEntry {
        id: row.get(0)?,
        workshop_id: row.get(1)?,
        day: row.get(2)?,
        day_key: row.get(3)?,
        orders_count: row.get(4)?,
        day_debt: row.get(5)?,
        day_paid: row.get(6)?,
        note: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::workshops::create_workshop;
    use rusqlite::Connection;

    fn test_db() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
        .expect("pragma setup");
        db::run_migrations_for_test(&conn);
        DbState {
            conn: std::sync::Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        }
    }

    fn test_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_upsert_replaces_not_duplicates() {
        let db = test_db();
        let cfg = test_config();
        let w = create_workshop(&db, "North").unwrap();

        upsert_entry(
            &db,
            &cfg,
            &w.id,
            "2024-05-04",
            &EntryDraft {
                orders_count: 3,
                day_debt: 100.0,
                day_paid: 0.0,
                note: Some("first".into()),
            },
        )
        .expect("first upsert");

        let replaced = upsert_entry(
            &db,
            &cfg,
            &w.id,
            "2024-05-04",
            &EntryDraft {
                orders_count: 5,
                day_debt: 150.0,
                day_paid: 20.0,
                note: None,
            },
        )
        .expect("second upsert");

        assert_eq!(replaced.orders_count, 5);
        assert_eq!(replaced.day_debt, 150.0);
        assert_eq!(replaced.day_paid, 20.0);
        assert_eq!(replaced.note, None, "replace semantics clear the note");

        let conn = db.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM daily_entries WHERE workshop_id = ?1 AND day_key = '2024-05-04'",
                params![w.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "exactly one row per (workshop, dayKey)");
    }

    #[test]
    fn test_day_keys_canonicalized_across_write_paths() {
        // chrono parses unpadded dates; an unpadded key must land on the
        // same row as its padded form, not a second row for the same day.
        let db = test_db();
        let cfg = test_config();
        let w = create_workshop(&db, "North").unwrap();

        upsert_entry(
            &db,
            &cfg,
            &w.id,
            "2024-5-4",
            &EntryDraft {
                orders_count: 1,
                day_debt: 100.0,
                day_paid: 0.0,
                note: None,
            },
        )
        .expect("unpadded upsert");

        let paid =
            record_payment(&db, &cfg, &w.id, Some("2024-05-04"), 30.0, None).expect("payment");
        assert_eq!(paid.day_key, "2024-05-04");
        assert_eq!(paid.day_debt, 100.0, "payment hit the upserted row");
        assert_eq!(paid.day_paid, 30.0);

        let conn = db.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM daily_entries WHERE workshop_id = ?1",
                params![w.id],
                |row| row.get(0),
            )
            .unwrap();
        drop(conn);
        assert_eq!(count, 1, "one calendar day, one row");

        let fetched = get_entry(&db, &w.id, "2024-5-4").expect("unpadded lookup");
        assert_eq!(fetched.day_key, "2024-05-04");

        let patched = update_entry(
            &db,
            &w.id,
            "2024-5-4",
            &EntryPatch {
                orders_count: Some(2),
                ..Default::default()
            },
        )
        .expect("unpadded patch");
        assert_eq!(patched.orders_count, 2);
    }

    #[test]
    fn test_upsert_validates_before_store() {
        let db = test_db();
        let cfg = test_config();
        let w = create_workshop(&db, "North").unwrap();

        let negative = upsert_entry(
            &db,
            &cfg,
            &w.id,
            "2024-05-04",
            &EntryDraft {
                day_debt: -1.0,
                ..Default::default()
            },
        );
        assert!(matches!(negative, Err(LedgerError::Validation(_))));

        let bad_date = upsert_entry(&db, &cfg, &w.id, "04/05/2024", &EntryDraft::default());
        assert!(matches!(bad_date, Err(LedgerError::Validation(_))));

        let unknown = upsert_entry(&db, &cfg, "nope", "2024-05-04", &EntryDraft::default());
        assert!(matches!(unknown, Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_update_entry_patches_only_given_fields() {
        let db = test_db();
        let cfg = test_config();
        let w = create_workshop(&db, "North").unwrap();

        upsert_entry(
            &db,
            &cfg,
            &w.id,
            "2024-05-04",
            &EntryDraft {
                orders_count: 3,
                day_debt: 100.0,
                day_paid: 10.0,
                note: Some("keep me".into()),
            },
        )
        .unwrap();

        let patched = update_entry(
            &db,
            &w.id,
            "2024-05-04",
            &EntryPatch {
                day_paid: Some(40.0),
                ..Default::default()
            },
        )
        .expect("patch");

        assert_eq!(patched.orders_count, 3);
        assert_eq!(patched.day_debt, 100.0);
        assert_eq!(patched.day_paid, 40.0);
        assert_eq!(patched.note.as_deref(), Some("keep me"));

        let replaced = update_entry(
            &db,
            &w.id,
            "2024-05-04",
            &EntryPatch {
                note: Some("new note".into()),
                ..Default::default()
            },
        )
        .expect("note patch");
        assert_eq!(replaced.note.as_deref(), Some("new note"));

        // A blank note is an explicit clear, not a no-op.
        let cleared = update_entry(
            &db,
            &w.id,
            "2024-05-04",
            &EntryPatch {
                note: Some(String::new()),
                ..Default::default()
            },
        )
        .expect("note clear");
        assert_eq!(cleared.note, None);
        assert_eq!(cleared.day_paid, 40.0, "other fields untouched");

        let missing = update_entry(&db, &w.id, "2024-05-05", &EntryPatch::default());
        assert!(matches!(missing, Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_record_payment_increments() {
        let db = test_db();
        let cfg = test_config();
        let w = create_workshop(&db, "North").unwrap();

        let first =
            record_payment(&db, &cfg, &w.id, Some("2024-05-04"), 30.0, None).expect("first");
        assert_eq!(first.day_paid, 30.0);
        assert_eq!(first.day_debt, 0.0, "fresh payment day starts with zero debt");

        let second =
            record_payment(&db, &cfg, &w.id, Some("2024-05-04"), 20.0, None).expect("second");
        assert_eq!(second.day_paid, 50.0, "increments accumulate, not overwrite");

        let rejected = record_payment(&db, &cfg, &w.id, Some("2024-05-04"), 0.0, None);
        assert!(matches!(rejected, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_record_payment_keeps_existing_debt() {
        let db = test_db();
        let cfg = test_config();
        let w = create_workshop(&db, "North").unwrap();

        upsert_entry(
            &db,
            &cfg,
            &w.id,
            "2024-05-04",
            &EntryDraft {
                orders_count: 2,
                day_debt: 80.0,
                ..Default::default()
            },
        )
        .unwrap();

        let after = record_payment(&db, &cfg, &w.id, Some("2024-05-04"), 25.0, None).unwrap();
        assert_eq!(after.day_debt, 80.0);
        assert_eq!(after.day_paid, 25.0);
        assert_eq!(after.orders_count, 2);
    }

    #[test]
    fn test_record_payment_defaults_to_today() {
        let db = test_db();
        let cfg = test_config();
        let w = create_workshop(&db, "North").unwrap();

        let entry = record_payment(&db, &cfg, &w.id, None, 15.0, None).unwrap();
        assert_eq!(
            entry.day_key,
            calendar::day_key(calendar::today(cfg.timezone))
        );
    }

    #[test]
    fn test_bot_paths_respect_auto_create() {
        let db = test_db();
        let cfg = test_config(); // auto-create off

        let denied = upsert_entry_by_name(
            &db,
            &cfg,
            "Ghost Atelier",
            "2024-05-04",
            &EntryDraft::default(),
            None,
        );
        assert!(matches!(denied, Err(LedgerError::NotFound(_))));

        // Per-call override wins over the config default.
        let created = upsert_entry_by_name(
            &db,
            &cfg,
            "Ghost Atelier",
            "2024-05-04",
            &EntryDraft {
                day_debt: 60.0,
                ..Default::default()
            },
            Some(true),
        )
        .expect("auto-create");
        assert_eq!(created.day_debt, 60.0);

        let paid = record_payment_by_name(&db, &cfg, "Ghost Atelier", 10.0, None, None)
            .expect("existing workshop resolves without auto-create");
        assert_eq!(paid.day_paid, 10.0);
    }

    #[test]
    fn test_list_entries_bounded() {
        let db = test_db();
        let cfg = test_config();
        let w = create_workshop(&db, "North").unwrap();

        for key in ["2024-05-01", "2024-05-04", "2024-05-09"] {
            upsert_entry(
                &db,
                &cfg,
                &w.id,
                key,
                &EntryDraft {
                    day_debt: 10.0,
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let all = list_entries(&db, &w.id, None, None).unwrap();
        assert_eq!(all.len(), 3);

        let bounded =
            list_entries(&db, &w.id, Some("2024-05-02"), Some("2024-05-08")).unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].day_key, "2024-05-04");
    }

    #[test]
    fn test_find_entries_in_range_filters() {
        let db = test_db();
        let cfg = test_config();
        let w1 = create_workshop(&db, "North").unwrap();
        let w2 = create_workshop(&db, "South").unwrap();

        for (w, key) in [(&w1, "2024-05-04"), (&w1, "2024-05-11"), (&w2, "2024-05-05")] {
            upsert_entry(
                &db,
                &cfg,
                &w.id,
                key,
                &EntryDraft {
                    day_debt: 10.0,
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let start = day_instant(cfg.timezone, "2024-05-04").unwrap();
        let end = day_instant(cfg.timezone, "2024-05-10").unwrap();

        let conn = db.conn.lock().unwrap();
        let all =
            find_entries_in_range(&conn, &WorkshopFilter::default(), &start, &end).unwrap();
        assert_eq!(all.len(), 2, "2024-05-11 falls outside the range");

        let only_north =
            find_entries_in_range(&conn, &WorkshopFilter::by_id(&w1.id), &start, &end).unwrap();
        assert_eq!(only_north.len(), 1);
        assert_eq!(only_north[0].day_key, "2024-05-04");

        let by_name =
            find_entries_in_range(&conn, &WorkshopFilter::by_name("South"), &start, &end)
                .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].workshop_id, w2.id);
    }
}
