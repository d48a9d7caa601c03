//! Calendar resolution for the Atelier Ledger.
//!
//! All period math is timezone-aware: "start of day" and the canonical
//! `YYYY-MM-DD` day key both resolve in the configured IANA zone, never at
//! UTC midnight. The business week runs Saturday through Friday; months and
//! years follow the calendar.
//!
//! Bucket shapes produced here (days of a week, Saturday-aligned weeks of a
//! month, twelve months of a year) are pure functions of the calendar and
//! never depend on which days happen to hold ledger data.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{LedgerError, Result};

const WEEK_LABELS: [&str; 5] = [
    "First week",
    "Second week",
    "Third week",
    "Fourth week",
    "Fifth week",
];

// ---------------------------------------------------------------------------
// Day boundaries
// ---------------------------------------------------------------------------

/// The timezone-local midnight instant of `date`.
///
/// Handles DST edges: an ambiguous midnight resolves to the earlier instant,
/// a skipped midnight resolves to the first valid instant after it.
pub fn start_of_day(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&midnight)),
    }
}

/// The last instant of `date` in the zone (one second before the next
/// day's local midnight).
pub fn end_of_day(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    let next = date.succ_opt().unwrap_or(date);
    start_of_day(tz, next) - Duration::seconds(1)
}

/// Canonical `YYYY-MM-DD` key for a calendar day.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` day key.
pub fn parse_day_key(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| LedgerError::validation(format!("malformed date: {s:?} (expected YYYY-MM-DD)")))
}

/// Today's calendar date in the zone.
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// The current instant in the zone.
pub fn now(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

// ---------------------------------------------------------------------------
// Period ranges
// ---------------------------------------------------------------------------

/// An inclusive period: `start` is the first day's local midnight, `end`
/// the last day's final second.
#[derive(Debug, Clone)]
pub struct PeriodRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

fn range_from_dates(tz: Tz, start_date: NaiveDate, end_date: NaiveDate) -> PeriodRange {
    PeriodRange {
        start_date,
        end_date,
        start: start_of_day(tz, start_date),
        end: end_of_day(tz, end_date),
    }
}

/// The Saturday at or before `date`.
///
/// With the week-of-week index `day` (0=Sunday..6=Saturday), the offset
/// back to Saturday is `(day + 1) mod 7`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let day = date.weekday().num_days_from_sunday();
    let offset = (day + 1) % 7;
    date - Duration::days(i64::from(offset))
}

/// The Saturday-through-Friday week containing `reference`.
pub fn week_range(tz: Tz, reference: NaiveDate) -> PeriodRange {
    let start = week_start(reference);
    range_from_dates(tz, start, start + Duration::days(6))
}

/// The calendar month containing (`year`, `month`).
pub fn month_range(tz: Tz, year: i32, month: u32) -> Result<PeriodRange> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| LedgerError::validation(format!("invalid month: {year}-{month}")))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| LedgerError::validation(format!("invalid month: {year}-{month}")))?;
    Ok(range_from_dates(tz, first, next_first - Duration::days(1)))
}

/// The calendar year `year`.
pub fn year_range(tz: Tz, year: i32) -> Result<PeriodRange> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| LedgerError::validation(format!("invalid year: {year}")))?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| LedgerError::validation(format!("invalid year: {year}")))?;
    Ok(range_from_dates(tz, first, last))
}

/// Clip a range end to the present: the minimum of the range end and the
/// end of `now`'s day. An in-progress period is never summed beyond today;
/// a fully-elapsed period keeps its full range.
pub fn active_end(tz: Tz, now: DateTime<Tz>, range: &PeriodRange) -> DateTime<Tz> {
    let today_end = end_of_day(tz, now.date_naive());
    if today_end < range.end {
        today_end
    } else {
        range.end
    }
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// One day of a weekly report grid.
#[derive(Debug, Clone)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub key: String,
    /// Localized weekday label, e.g. `"Saturday (2024-05-04)"`.
    pub label: String,
}

/// Exactly seven day buckets, Saturday through Friday, from a week start.
pub fn days_of_week(start: NaiveDate) -> Vec<DayBucket> {
    (0..7)
        .map(|i| {
            let date = start + Duration::days(i);
            DayBucket {
                date,
                key: day_key(date),
                label: format!("{} ({})", date.format("%A"), day_key(date)),
            }
        })
        .collect()
}

/// One Saturday-aligned week of a monthly report grid.
#[derive(Debug, Clone)]
pub struct WeekBucket {
    /// Day key of the week's Saturday (may fall in the previous month).
    pub key: String,
    pub label: String,
}

/// Partition a month's days into Saturday-aligned weeks.
///
/// Only weeks that actually occur in the month are surfaced: typically
/// four or five, ordinally labeled, with a numeric fallback past the fifth.
pub fn weeks_of_month(year: i32, month: u32) -> Result<Vec<WeekBucket>> {
    let range = month_range(chrono_tz::UTC, year, month)?;
    let mut starts: Vec<NaiveDate> = Vec::new();
    let mut date = range.start_date;
    while date <= range.end_date {
        let ws = week_start(date);
        if starts.last() != Some(&ws) {
            starts.push(ws);
        }
        date += Duration::days(1);
    }
    Ok(starts
        .into_iter()
        .enumerate()
        .map(|(idx, ws)| WeekBucket {
            key: day_key(ws),
            label: WEEK_LABELS
                .get(idx)
                .map(|s| (*s).to_string())
                .unwrap_or_else(|| format!("Week {}", idx + 1)),
        })
        .collect())
}

/// One month of a yearly report grid.
#[derive(Debug, Clone)]
pub struct MonthBucket {
    /// `YYYY-MM` key.
    pub key: String,
    pub label: String,
}

/// Fixed twelve month buckets for a year, keyed `YYYY-MM`.
pub fn months_of_year(year: i32) -> Vec<MonthBucket> {
    (1..=12)
        .map(|m| MonthBucket {
            key: format!("{year}-{m:02}"),
            label: format!("Month {m:02}"),
        })
        .collect()
}

/// `YYYY-MM` bucket key for a day key. Day keys are canonical, so this is
/// a plain prefix.
pub fn year_month_of(day_key: &str) -> String {
    day_key.chars().take(7).collect()
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    fn tz() -> Tz {
        "Africa/Algiers".parse().unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_week_start_maps_every_weekday_to_saturday() {
        // 2024-05-04 is a Saturday; the whole Sat..Fri week maps back to it.
        for i in 0..7 {
            let date = d("2024-05-04") + Duration::days(i);
            assert_eq!(week_start(date), d("2024-05-04"), "day offset {i}");
        }
        // The day before belongs to the previous week.
        assert_eq!(week_start(d("2024-05-03")), d("2024-04-27"));
    }

    #[test]
    fn test_week_range_spans_saturday_to_friday() {
        let range = week_range(tz(), d("2024-05-08")); // a Wednesday
        assert_eq!(range.start_date, d("2024-05-04"));
        assert_eq!(range.end_date, d("2024-05-10"));
        assert!(range.start < range.end);
    }

    #[test]
    fn test_days_of_week_has_exactly_seven() {
        let days = days_of_week(d("2024-05-04"));
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].key, "2024-05-04");
        assert_eq!(days[6].key, "2024-05-10");
        assert_eq!(days[0].label, "Saturday (2024-05-04)");
        assert_eq!(days[1].label, "Sunday (2024-05-05)");
        assert_eq!(days[6].label, "Friday (2024-05-10)");
    }

    #[test]
    fn test_month_range() {
        let range = month_range(tz(), 2024, 2).unwrap();
        assert_eq!(range.start_date, d("2024-02-01"));
        assert_eq!(range.end_date, d("2024-02-29")); // leap year

        assert!(month_range(tz(), 2024, 13).is_err());
        assert!(month_range(tz(), 2024, 0).is_err());
    }

    #[test]
    fn test_year_range() {
        let range = year_range(tz(), 2024).unwrap();
        assert_eq!(range.start_date, d("2024-01-01"));
        assert_eq!(range.end_date, d("2024-12-31"));
    }

    #[test]
    fn test_active_end_clips_in_progress_period() {
        let range = month_range(tz(), 2024, 5).unwrap();
        let mid_month = start_of_day(tz(), d("2024-05-10")) + Duration::hours(13);
        assert_eq!(
            active_end(tz(), mid_month, &range),
            end_of_day(tz(), d("2024-05-10"))
        );

        // A fully-elapsed period keeps its full end.
        let later = start_of_day(tz(), d("2024-07-01"));
        assert_eq!(active_end(tz(), later, &range), range.end);
    }

    #[test]
    fn test_weeks_of_month_four_weeks() {
        // February 2025 starts on a Saturday and has 28 days.
        let weeks = weeks_of_month(2025, 2).unwrap();
        assert_eq!(weeks.len(), 4);
        assert_eq!(weeks[0].key, "2025-02-01");
        assert_eq!(weeks[0].label, "First week");
        assert_eq!(weeks[3].key, "2025-02-22");
        assert_eq!(weeks[3].label, "Fourth week");
    }

    #[test]
    fn test_weeks_of_month_five_weeks() {
        // May 2024: first week starts the previous Saturday (Apr 27).
        let weeks = weeks_of_month(2024, 5).unwrap();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0].key, "2024-04-27");
        assert_eq!(weeks[4].key, "2024-05-25");
        assert_eq!(weeks[4].label, "Fifth week");
    }

    #[test]
    fn test_weeks_of_month_six_weeks_uses_fallback_label() {
        // March 2024 touches six Saturday-aligned weeks.
        let weeks = weeks_of_month(2024, 3).unwrap();
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[0].key, "2024-02-24");
        assert_eq!(weeks[5].key, "2024-03-30");
        assert_eq!(weeks[5].label, "Week 6");
    }

    #[test]
    fn test_months_of_year() {
        let months = months_of_year(2024);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].key, "2024-01");
        assert_eq!(months[11].key, "2024-12");
        assert_eq!(months[0].label, "Month 01");
    }

    #[test]
    fn test_day_key_round_trip() {
        assert_eq!(day_key(d("2024-05-04")), "2024-05-04");
        assert_eq!(parse_day_key("2024-05-04").unwrap(), d("2024-05-04"));
        assert!(parse_day_key("04/05/2024").is_err());
        assert!(parse_day_key("2024-13-40").is_err());
    }

    #[test]
    fn test_year_month_of() {
        assert_eq!(year_month_of("2024-05-04"), "2024-05");
    }

    #[test]
    fn test_start_of_day_uses_zone_offset() {
        // Africa/Algiers is UTC+1 year-round: local midnight is 23:00 UTC
        // the previous day.
        let start = start_of_day(tz(), d("2024-05-04"));
        assert_eq!(start.naive_utc(), d("2024-05-03").and_hms_opt(23, 0, 0).unwrap());
    }
}
