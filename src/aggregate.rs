//! Aggregation engine for the Atelier Ledger.
//!
//! Two modes over the daily ledger:
//! - flat range aggregation: one sum row per workshop over [start, end];
//! - bucketed aggregation: one sum row per (workshop, bucket), where the
//!   bucket key is derived from the entry's day key (the day itself, its
//!   Saturday week start, or its `YYYY-MM` month).
//!
//! Results always start from the full workshop roster and overlay sparse
//! sums onto it: a workshop with no entries in range still appears with
//! all-zero values. Outstanding debt is `max(0, debt - paid)`, computed
//! independently at each rollup level from that level's own raw sums,
//! never by summing lower-level clamped values.

use rusqlite::{params, Connection};
use std::collections::HashMap;

use crate::error::Result;
use crate::ledger::{self, EntryRow};
use crate::workshops::{self, WorkshopFilter, WorkshopRef};

/// Outstanding balance for a scope: debt minus paid, floored at zero.
/// Overpayment is absorbed, never carried as credit.
pub fn outstanding(total_debt: f64, total_paid: f64) -> f64 {
    (total_debt - total_paid).max(0.0)
}

/// Raw sums for one workshop over a flat range.
#[derive(Debug, Clone, Default)]
pub struct RangeSums {
    pub orders_count: i64,
    pub total_debt: f64,
    pub total_paid: f64,
}

/// A workshop row in a flat aggregation result: roster identity plus sums
/// and the derived outstanding balance.
#[derive(Debug, Clone)]
pub struct WorkshopTotals {
    pub workshop: WorkshopRef,
    pub orders_count: i64,
    pub total_debt: f64,
    pub total_paid: f64,
    pub outstanding: f64,
}

/// Flat range aggregation: per-workshop sums over [start, end] inclusive
/// (either bound may be open), roster-first so inactive workshops appear
/// with zeros.
pub(crate) fn flat_totals(
    conn: &Connection,
    filter: &WorkshopFilter,
    start_utc: Option<&str>,
    end_utc: Option<&str>,
) -> Result<Vec<WorkshopTotals>> {
    let roster = workshops::roster(conn, filter)?;

    let mut stmt = conn.prepare(
        "SELECT workshop_id,
                COALESCE(SUM(orders_count), 0),
                COALESCE(SUM(day_debt), 0),
                COALESCE(SUM(day_paid), 0)
         FROM daily_entries
         WHERE (?1 IS NULL OR day >= ?1)
           AND (?2 IS NULL OR day <= ?2)
         GROUP BY workshop_id",
    )?;
    let rows = stmt.query_map(params![start_utc, end_utc], |row| {
        Ok((
            row.get::<_, String>(0)?,
            RangeSums {
                orders_count: row.get(1)?,
                total_debt: row.get(2)?,
                total_paid: row.get(3)?,
            },
        ))
    })?;

    let mut by_workshop: HashMap<String, RangeSums> = HashMap::new();
    for row in rows {
        let (id, sums) = row?;
        by_workshop.insert(id, sums);
    }

    Ok(roster
        .into_iter()
        .map(|w| {
            let sums = by_workshop.remove(&w.id).unwrap_or_default();
            WorkshopTotals {
                outstanding: outstanding(sums.total_debt, sums.total_paid),
                orders_count: sums.orders_count,
                total_debt: sums.total_debt,
                total_paid: sums.total_paid,
                workshop: w,
            }
        })
        .collect())
}

/// Sums for one (workshop, bucket) pair.
#[derive(Debug, Clone, Default)]
pub struct BucketSums {
    pub orders_count: i64,
    pub total_debt: f64,
    pub total_paid: f64,
    /// First note seen in the bucket (weekly day buckets surface it).
    pub note: Option<String>,
}

/// Bucketed aggregation: group entries in [start, end] by (workshop, bucket
/// key), where `bucket_key` maps an entry's day key to its bucket.
///
/// The key map is injected by the report builders so the grouping always
/// matches the calendar resolver's bucket definitions.
pub(crate) fn bucket_totals(
    conn: &Connection,
    filter: &WorkshopFilter,
    start_utc: &str,
    end_utc: &str,
    bucket_key: impl Fn(&str) -> String,
) -> Result<HashMap<(String, String), BucketSums>> {
    let entries: Vec<EntryRow> =
        ledger::find_entries_in_range(conn, filter, start_utc, end_utc)?;

    let mut buckets: HashMap<(String, String), BucketSums> = HashMap::new();
    for entry in entries {
        let key = (entry.workshop_id.clone(), bucket_key(&entry.day_key));
        let sums = buckets.entry(key).or_default();
        sums.orders_count += entry.orders_count;
        sums.total_debt += entry.day_debt;
        sums.total_paid += entry.day_paid;
        if sums.note.is_none() {
            sums.note = entry.note;
        }
    }
    Ok(buckets)
}

// ===========================================================================
// Tests
// ===========================================================================
