//! Structured (grid) reports: weekly, monthly, and yearly.
//!
//! Each report is a time-bucketed tree (period, then workshop, then
//! sub-bucket) with counts and amounts rolled up at every level:
//!
//! - weekly: seven day cells, Saturday through Friday;
//! - monthly: the month's Saturday-aligned weeks (typically 4-5);
//! - yearly: twelve `YYYY-MM` month cells.
//!
//! The bucket grid comes from the calendar resolver and is pre-initialized
//! with zeros for every roster workshop, then sparse aggregation sums are
//! laid into it. `debtAmount` clamps at zero independently at each level
//! from that level's own debt/paid sums; the grand totals sum the
//! per-workshop clamped totals without a second clamp, since per-workshop
//! debt is already non-negative.

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::aggregate::{self, BucketSums};
use crate::calendar::{self, PeriodRange};
use crate::config::Config;
use crate::db::DbState;
use crate::error::Result;
use crate::workshops::{self, WorkshopFilter, WorkshopRef};

pub const WEEKLY_TYPE: &str = "weekly-structured";
pub const MONTHLY_TYPE: &str = "monthly-structured";
pub const YEARLY_TYPE: &str = "yearly-structured";

/// Rolled-up counts and amounts for one workshop or one whole report.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub orders_count: i64,
    /// Debt incurred in the period.
    pub total_amount: f64,
    pub paid_amount: f64,
    /// Outstanding: `max(0, totalAmount - paidAmount)` for this level.
    pub debt_amount: f64,
}

impl Totals {
    fn add_raw(&mut self, sums: &BucketSums) {
        self.orders_count += sums.orders_count;
        self.total_amount += sums.total_debt;
        self.paid_amount += sums.total_paid;
    }

    fn clamp_debt(&mut self) {
        self.debt_amount = aggregate::outstanding(self.total_amount, self.paid_amount);
    }

    fn add_clamped(&mut self, other: &Totals) {
        self.orders_count += other.orders_count;
        self.total_amount += other.total_amount;
        self.paid_amount += other.paid_amount;
        self.debt_amount += other.debt_amount;
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRange {
    pub start: String,
    pub end: String,
}

impl StructuredRange {
    fn from(range: &PeriodRange) -> Self {
        StructuredRange {
            start: range.start.to_rfc3339(),
            end: range.end.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Weekly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayLabel {
    pub date: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMeta {
    #[serde(rename = "type")]
    pub report_type: String,
    pub timezone: String,
    pub range: StructuredRange,
    pub days: Vec<DayLabel>,
}

/// One day cell: orders taken and debt incurred that day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub date: String,
    pub label: String,
    pub orders_count: i64,
    pub total_amount: f64,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyWorkshop {
    pub workshop_id: String,
    pub workshop_name: String,
    pub days: Vec<DayCell>,
    pub weekly_totals: Totals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub meta: WeeklyMeta,
    pub workshops: Vec<WeeklyWorkshop>,
    pub totals: Totals,
}

/// Build the weekly structured report for the Saturday-start week containing
/// `reference` (today when absent).
pub fn generate_weekly(
    db: &DbState,
    config: &Config,
    reference: Option<NaiveDate>,
) -> Result<WeeklyReport> {
    let tz = config.timezone;
    let reference = reference.unwrap_or_else(|| calendar::today(tz));
    let range = calendar::week_range(tz, reference);
    let days = calendar::days_of_week(range.start_date);

    let start = range.start.with_timezone(&Utc).to_rfc3339();
    let end = range.end.with_timezone(&Utc).to_rfc3339();

    let conn = db.lock()?;
    let roster = workshops::roster(&conn, &WorkshopFilter::default())?;
    let buckets = aggregate::bucket_totals(
        &conn,
        &WorkshopFilter::default(),
        &start,
        &end,
        |day_key| day_key.to_string(),
    )?;
    drop(conn);

    let mut grand = Totals::default();
    let workshops = overlay(roster, &days_grid(&days), buckets, &mut grand, |w, cells, totals| {
        WeeklyWorkshop {
            workshop_id: w.id,
            workshop_name: w.name,
            days: cells
                .into_iter()
                .zip(&days)
                .map(|(cell, day)| DayCell {
                    date: day.key.clone(),
                    label: day.label.clone(),
                    orders_count: cell.orders_count,
                    total_amount: cell.total_debt,
                    note: cell.note.unwrap_or_default(),
                })
                .collect(),
            weekly_totals: totals,
        }
    });

    Ok(WeeklyReport {
        meta: WeeklyMeta {
            report_type: WEEKLY_TYPE.to_string(),
            timezone: tz.name().to_string(),
            range: StructuredRange::from(&range),
            days: days
                .iter()
                .map(|d| DayLabel {
                    date: d.key.clone(),
                    label: d.label.clone(),
                })
                .collect(),
        },
        workshops,
        totals: grand,
    })
}

// ---------------------------------------------------------------------------
// Monthly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekLabel {
    pub label: String,
    pub week_start: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyMeta {
    #[serde(rename = "type")]
    pub report_type: String,
    pub timezone: String,
    /// `YYYY-MM`.
    pub month: String,
    pub range: StructuredRange,
    pub weeks: Vec<WeekLabel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCell {
    pub label: String,
    pub week_start: String,
    pub orders_count: i64,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub debt_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyWorkshop {
    pub workshop_id: String,
    pub workshop_name: String,
    pub weeks: Vec<WeekCell>,
    pub monthly_totals: Totals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub meta: MonthlyMeta,
    pub workshops: Vec<MonthlyWorkshop>,
    pub totals: Totals,
}

/// Build the monthly structured report; defaults to the current month.
pub fn generate_monthly(
    db: &DbState,
    config: &Config,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<MonthlyReport> {
    let tz = config.timezone;
    let today = calendar::today(tz);
    let year = year.unwrap_or_else(|| today.year());
    let month = month.unwrap_or_else(|| today.month());

    let range = calendar::month_range(tz, year, month)?;
    let weeks = calendar::weeks_of_month(year, month)?;

    let start = range.start.with_timezone(&Utc).to_rfc3339();
    let end = range.end.with_timezone(&Utc).to_rfc3339();

    let conn = db.lock()?;
    let roster = workshops::roster(&conn, &WorkshopFilter::default())?;
    let buckets = aggregate::bucket_totals(
        &conn,
        &WorkshopFilter::default(),
        &start,
        &end,
        |day_key| match calendar::parse_day_key(day_key) {
            Ok(date) => calendar::day_key(calendar::week_start(date)),
            Err(_) => day_key.to_string(),
        },
    )?;
    drop(conn);

    let keys: Vec<String> = weeks.iter().map(|w| w.key.clone()).collect();
    let mut grand = Totals::default();
    let workshops = overlay(roster, &keys, buckets, &mut grand, |w, cells, totals| {
        MonthlyWorkshop {
            workshop_id: w.id,
            workshop_name: w.name,
            weeks: cells
                .into_iter()
                .zip(&weeks)
                .map(|(cell, week)| WeekCell {
                    label: week.label.clone(),
                    week_start: week.key.clone(),
                    orders_count: cell.orders_count,
                    total_amount: cell.total_debt,
                    paid_amount: cell.total_paid,
                    debt_amount: aggregate::outstanding(cell.total_debt, cell.total_paid),
                })
                .collect(),
            monthly_totals: totals,
        }
    });

    Ok(MonthlyReport {
        meta: MonthlyMeta {
            report_type: MONTHLY_TYPE.to_string(),
            timezone: tz.name().to_string(),
            month: format!("{year}-{month:02}"),
            range: StructuredRange::from(&range),
            weeks: weeks
                .iter()
                .map(|w| WeekLabel {
                    label: w.label.clone(),
                    week_start: w.key.clone(),
                })
                .collect(),
        },
        workshops,
        totals: grand,
    })
}

// ---------------------------------------------------------------------------
// Yearly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyMeta {
    #[serde(rename = "type")]
    pub report_type: String,
    pub timezone: String,
    pub year: i32,
    pub range: StructuredRange,
    /// Twelve `YYYY-MM` keys.
    pub months: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCell {
    pub label: String,
    pub ym: String,
    pub orders_count: i64,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub debt_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyWorkshop {
    pub workshop_id: String,
    pub workshop_name: String,
    pub months: Vec<MonthCell>,
    pub yearly_totals: Totals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyReport {
    pub meta: YearlyMeta,
    pub workshops: Vec<YearlyWorkshop>,
    pub totals: Totals,
}

/// Build the yearly structured report; defaults to the current year.
pub fn generate_yearly(db: &DbState, config: &Config, year: Option<i32>) -> Result<YearlyReport> {
    let tz = config.timezone;
    let year = year.unwrap_or_else(|| calendar::today(tz).year());

    let range = calendar::year_range(tz, year)?;
    let months = calendar::months_of_year(year);

    let start = range.start.with_timezone(&Utc).to_rfc3339();
    let end = range.end.with_timezone(&Utc).to_rfc3339();

    let conn = db.lock()?;
    let roster = workshops::roster(&conn, &WorkshopFilter::default())?;
    let buckets = aggregate::bucket_totals(
        &conn,
        &WorkshopFilter::default(),
        &start,
        &end,
        |day_key| calendar::year_month_of(day_key),
    )?;
    drop(conn);

    let keys: Vec<String> = months.iter().map(|m| m.key.clone()).collect();
    let mut grand = Totals::default();
    let workshops = overlay(roster, &keys, buckets, &mut grand, |w, cells, totals| {
        YearlyWorkshop {
            workshop_id: w.id,
            workshop_name: w.name,
            months: cells
                .into_iter()
                .zip(&months)
                .map(|(cell, month)| MonthCell {
                    label: month.label.clone(),
                    ym: month.key.clone(),
                    orders_count: cell.orders_count,
                    total_amount: cell.total_debt,
                    paid_amount: cell.total_paid,
                    debt_amount: aggregate::outstanding(cell.total_debt, cell.total_paid),
                })
                .collect(),
            yearly_totals: totals,
        }
    });

    Ok(YearlyReport {
        meta: YearlyMeta {
            report_type: YEARLY_TYPE.to_string(),
            timezone: tz.name().to_string(),
            year,
            range: StructuredRange::from(&range),
            months: keys,
        },
        workshops,
        totals: grand,
    })
}

// ---------------------------------------------------------------------------
// Grid overlay
// ---------------------------------------------------------------------------

fn days_grid(days: &[calendar::DayBucket]) -> Vec<String> {
    days.iter().map(|d| d.key.clone()).collect()
}

/// Lay sparse (workshop, bucket) sums into a pre-initialized grid of bucket
/// keys for every roster workshop, rolling up per-workshop totals (clamped)
/// and the grand totals (sum of clamped).
fn overlay<T>(
    roster: Vec<WorkshopRef>,
    bucket_keys: &[String],
    mut buckets: HashMap<(String, String), BucketSums>,
    grand: &mut Totals,
    build: impl Fn(WorkshopRef, Vec<BucketSums>, Totals) -> T,
) -> Vec<T> {
    roster
        .into_iter()
        .map(|w| {
            let mut totals = Totals::default();
            let cells: Vec<BucketSums> = bucket_keys
                .iter()
                .map(|key| {
                    let sums = buckets
                        .remove(&(w.id.clone(), key.clone()))
                        .unwrap_or_default();
                    totals.add_raw(&sums);
                    sums
                })
                .collect();
            totals.clamp_debt();
            grand.add_clamped(&totals);
            build(w, cells, totals)
        })
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
