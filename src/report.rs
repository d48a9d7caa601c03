//! Flat summary reports and outstanding-debt queries.
//!
//! A summary report covers one calendar period (Saturday-start week, month,
//! year, or an explicit custom range) and carries one row per workshop plus
//! grand totals. In-progress periods are summed only up to the end of the
//! current day (`activeEnd`); fully-elapsed periods keep their full range.

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::aggregate::{self, WorkshopTotals};
use crate::calendar::{self, PeriodRange};
use crate::config::Config;
use crate::db::DbState;
use crate::error::{LedgerError, Result};
use crate::workshops::WorkshopFilter;

// ---------------------------------------------------------------------------
// Periods and range resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    /// Parse a period name; anything unknown is a validation failure.
    pub fn parse(s: &str) -> Result<Period> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "yearly" => Ok(Period::Yearly),
            other => Err(LedgerError::validation(format!("unknown period: {other:?}"))),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }
}

/// Query options for a summary report.
#[derive(Debug, Clone, Default)]
pub struct SummaryOptions {
    pub period: Option<Period>,
    /// Reference date overriding "today" for the calendar-derived range.
    pub reference: Option<NaiveDate>,
    /// Explicit custom range (both bounds required) replacing the
    /// calendar-derived one.
    pub from: Option<String>,
    pub to: Option<String>,
    pub workshop_id: Option<String>,
    pub workshop_name: Option<String>,
}

struct ResolvedRange {
    label: String,
    range: PeriodRange,
    active_end: chrono::DateTime<chrono_tz::Tz>,
}

fn resolve_range(config: &Config, opts: &SummaryOptions) -> Result<ResolvedRange> {
    let tz = config.timezone;

    match (&opts.from, &opts.to) {
        (Some(from), Some(to)) => {
            let from = calendar::parse_day_key(from)?;
            let to = calendar::parse_day_key(to)?;
            if from > to {
                return Err(LedgerError::validation(format!(
                    "custom range start {from} is after end {to}"
                )));
            }
            let range = PeriodRange {
                start_date: from,
                end_date: to,
                start: calendar::start_of_day(tz, from),
                end: calendar::end_of_day(tz, to),
            };
            let active_end = range.end;
            Ok(ResolvedRange {
                label: "custom".to_string(),
                range,
                active_end,
            })
        }
        (None, None) => {
            use chrono::Datelike;
            let reference = opts.reference.unwrap_or_else(|| calendar::today(tz));
            let period = opts.period.unwrap_or(Period::Weekly);
            let range = match period {
                Period::Weekly => calendar::week_range(tz, reference),
                Period::Monthly => calendar::month_range(tz, reference.year(), reference.month())?,
                Period::Yearly => calendar::year_range(tz, reference.year())?,
            };
            let active_end = calendar::active_end(tz, calendar::now(tz), &range);
            Ok(ResolvedRange {
                label: period.label().to_string(),
                range,
                active_end,
            })
        }
        _ => Err(LedgerError::validation(
            "custom range requires both from and to",
        )),
    }
}

// ---------------------------------------------------------------------------
// Summary report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeMeta {
    pub start: String,
    pub end: String,
    pub active_end: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMeta {
    pub period: String,
    pub timezone: String,
    pub range: RangeMeta,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopSummary {
    pub workshop_id: String,
    pub workshop_name: String,
    pub orders_count: i64,
    /// Debt incurred in range.
    pub total_amount: f64,
    pub paid_amount: f64,
    pub outstanding: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
    pub workshops_count: usize,
    pub orders_count: i64,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub outstanding: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub meta: SummaryMeta,
    pub workshops: Vec<WorkshopSummary>,
    pub totals: SummaryTotals,
}

fn summary_rows(totals: Vec<WorkshopTotals>) -> (Vec<WorkshopSummary>, SummaryTotals) {
    let mut grand_orders = 0i64;
    let mut grand_debt = 0.0f64;
    let mut grand_paid = 0.0f64;

    let rows: Vec<WorkshopSummary> = totals
        .into_iter()
        .map(|t| {
            grand_orders += t.orders_count;
            grand_debt += t.total_debt;
            grand_paid += t.total_paid;
            WorkshopSummary {
                workshop_id: t.workshop.id,
                workshop_name: t.workshop.name,
                orders_count: t.orders_count,
                total_amount: t.total_debt,
                paid_amount: t.total_paid,
                outstanding: t.outstanding,
            }
        })
        .collect();

    // Grand outstanding clamps independently from the raw grand sums, not
    // by summing the per-workshop clamped values.
    let totals = SummaryTotals {
        workshops_count: rows.len(),
        orders_count: grand_orders,
        total_amount: grand_debt,
        paid_amount: grand_paid,
        outstanding: aggregate::outstanding(grand_debt, grand_paid),
    };
    (rows, totals)
}

/// Generate a flat summary report for a period or custom range.
pub fn generate_summary_report(
    db: &DbState,
    config: &Config,
    opts: &SummaryOptions,
) -> Result<SummaryReport> {
    let resolved = resolve_range(config, opts)?;
    let filter = WorkshopFilter {
        id: opts.workshop_id.clone(),
        name: opts.workshop_name.clone(),
    };

    let start = resolved.range.start.with_timezone(&Utc).to_rfc3339();
    let active_end = resolved.active_end.with_timezone(&Utc).to_rfc3339();

    let conn = db.lock()?;
    let per_workshop = aggregate::flat_totals(&conn, &filter, Some(&start), Some(&active_end))?;
    drop(conn);

    let (workshops, totals) = summary_rows(per_workshop);

    Ok(SummaryReport {
        meta: SummaryMeta {
            period: resolved.label,
            timezone: config.timezone.name().to_string(),
            range: RangeMeta {
                start: resolved.range.start.to_rfc3339(),
                end: resolved.range.end.to_rfc3339(),
                active_end: resolved.active_end.to_rfc3339(),
            },
            generated_at: calendar::now(config.timezone).to_rfc3339(),
        },
        workshops,
        totals,
    })
}

// ---------------------------------------------------------------------------
// Outstanding debts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtsMeta {
    pub timezone: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopDebt {
    pub workshop_id: String,
    pub workshop_name: String,
    pub orders_count: i64,
    pub total_debt: f64,
    pub total_paid: f64,
    pub outstanding: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtsTotals {
    pub workshops_count: usize,
    pub orders_count: i64,
    pub total_debt: f64,
    pub total_paid: f64,
    pub outstanding: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtsReport {
    pub meta: DebtsMeta,
    pub per_workshop: Vec<WorkshopDebt>,
    pub totals: DebtsTotals,
}

/// Outstanding debts per workshop, over the whole ledger or an optional
/// from/to day-key window (each bound independent).
pub fn outstanding_debts(
    db: &DbState,
    config: &Config,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<DebtsReport> {
    let tz = config.timezone;
    let start = from
        .map(calendar::parse_day_key)
        .transpose()?
        .map(|d| calendar::start_of_day(tz, d).with_timezone(&Utc).to_rfc3339());
    let end = to
        .map(calendar::parse_day_key)
        .transpose()?
        .map(|d| calendar::end_of_day(tz, d).with_timezone(&Utc).to_rfc3339());

    let conn = db.lock()?;
    let per_workshop =
        aggregate::flat_totals(&conn, &WorkshopFilter::default(), start.as_deref(), end.as_deref())?;
    drop(conn);

    let mut totals = DebtsTotals {
        workshops_count: per_workshop.len(),
        ..Default::default()
    };
    let rows: Vec<WorkshopDebt> = per_workshop
        .into_iter()
        .map(|t| {
            totals.orders_count += t.orders_count;
            totals.total_debt += t.total_debt;
            totals.total_paid += t.total_paid;
            WorkshopDebt {
                workshop_id: t.workshop.id,
                workshop_name: t.workshop.name,
                orders_count: t.orders_count,
                total_debt: t.total_debt,
                total_paid: t.total_paid,
                outstanding: t.outstanding,
            }
        })
        .collect();
    totals.outstanding = aggregate::outstanding(totals.total_debt, totals.total_paid);

    Ok(DebtsReport {
        meta: DebtsMeta {
            timezone: tz.name().to_string(),
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            generated_at: calendar::now(tz).to_rfc3339(),
        },
        per_workshop: rows,
        totals,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
