//! Workshop roster management for the Atelier Ledger.
//!
//! Workshops are the entities the ledger tracks: unique id, unique display
//! name, never deleted. Creation is explicit, or implicit on the first
//! bot-originated write when auto-create is enabled. Aggregation always
//! starts from this roster so inactive workshops still appear in reports.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::db::DbState;
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Identity-only projection used by the aggregation engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopRef {
    pub id: String,
    pub name: String,
}

/// Optional exact-match narrowing for aggregation queries.
#[derive(Debug, Clone, Default)]
pub struct WorkshopFilter {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl WorkshopFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        WorkshopFilter {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        WorkshopFilter {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    // Character count, not bytes: names are commonly non-ASCII.
    let chars = trimmed.chars().count();
    if chars < 2 || chars > 100 {
        return Err(LedgerError::validation(
            "workshop name must be 2..=100 characters",
        ));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// Create a workshop with a unique display name.
pub fn create_workshop(db: &DbState, name: &str) -> Result<Workshop> {
    let conn = db.lock()?;
    create_workshop_on(&conn, name)
}

pub(crate) fn create_workshop_on(conn: &Connection, name: &str) -> Result<Workshop> {
    let name = validate_name(name)?;

    let exists: Option<String> = conn
        .query_row(
            "SELECT id FROM workshops WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(LedgerError::validation(format!(
            "workshop already exists: {name}"
        )));
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO workshops (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![id, name, now],
    )?;

    info!(workshop_id = %id, name = %name, "Workshop created");

    Ok(Workshop {
        id,
        name,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// List workshops, optionally narrowed by a case-insensitive partial name,
/// sorted by name.
pub fn list_workshops(db: &DbState, name_query: Option<&str>) -> Result<Vec<Workshop>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT id, name, created_at, updated_at FROM workshops
         WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%' COLLATE NOCASE)
         ORDER BY name ASC",
    )?;
    let rows = stmt.query_map(params![name_query], |row| {
        Ok(Workshop {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    })?;

    let mut workshops = Vec::new();
    for row in rows {
        workshops.push(row?);
    }
    Ok(workshops)
}

/// Fetch a workshop by id.
pub fn get_workshop(db: &DbState, workshop_id: &str) -> Result<Workshop> {
    let conn = db.lock()?;
    conn.query_row(
        "SELECT id, name, created_at, updated_at FROM workshops WHERE id = ?1",
        params![workshop_id],
        |row| {
            Ok(Workshop {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found(format!("workshop: {workshop_id}")))
}

/// Rename a workshop. The new name must not collide with another workshop.
pub fn rename_workshop(db: &DbState, workshop_id: &str, new_name: &str) -> Result<Workshop> {
    let conn = db.lock()?;
    let name = validate_name(new_name)?;

    let taken: Option<String> = conn
        .query_row(
            "SELECT id FROM workshops WHERE name = ?1 AND id != ?2",
            params![name, workshop_id],
            |row| row.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(LedgerError::validation(format!(
            "workshop already exists: {name}"
        )));
    }

    let now = Utc::now().to_rfc3339();
    let changed = conn.execute(
        "UPDATE workshops SET name = ?1, updated_at = ?2 WHERE id = ?3",
        params![name, now, workshop_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::not_found(format!("workshop: {workshop_id}")));
    }

    info!(workshop_id = %workshop_id, name = %name, "Workshop renamed");
    drop(conn);

    get_workshop(db, workshop_id)
}

// ---------------------------------------------------------------------------
// Roster and name resolution (aggregation + bot write paths)
// ---------------------------------------------------------------------------

/// The known-workshop roster, optionally narrowed by exact id or name.
///
/// Reports start from this set and overlay sparse ledger sums onto it;
/// workshop existence is never inferred from ledger rows.
pub(crate) fn roster(conn: &Connection, filter: &WorkshopFilter) -> Result<Vec<WorkshopRef>> {
    let mut stmt = conn.prepare(
        "SELECT id, name FROM workshops
         WHERE (?1 IS NULL OR id = ?1)
           AND (?2 IS NULL OR name = ?2)
         ORDER BY name ASC",
    )?;
    let rows = stmt.query_map(params![filter.id, filter.name], |row| {
        Ok(WorkshopRef {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut workshops = Vec::new();
    for row in rows {
        workshops.push(row?);
    }
    Ok(workshops)
}

/// Resolve a workshop by exact name, creating it when `allow_auto_create`
/// is set. Unknown name with auto-create off is a not-found failure.
pub(crate) fn resolve_or_create(
    conn: &Connection,
    name: &str,
    allow_auto_create: bool,
) -> Result<WorkshopRef> {
    let name = validate_name(name)?;

    let found: Option<WorkshopRef> = conn
        .query_row(
            "SELECT id, name FROM workshops WHERE name = ?1",
            params![name],
            |row| {
                Ok(WorkshopRef {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;

    if let Some(w) = found {
        return Ok(w);
    }
    if !allow_auto_create {
        return Err(LedgerError::not_found(format!("workshop: {name}")));
    }

    let created = create_workshop_on(conn, &name)?;
    Ok(WorkshopRef {
        id: created.id,
        name: created.name,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
