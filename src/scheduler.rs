//! Daily report refresh scheduler.
//!
//! A background task sleeps until the configured `HH:MM` wall-clock time in
//! the configured timezone, rebuilds the weekly, monthly, and yearly reports
//! for the current period, and publishes them to the cache in one swap. A
//! failed refresh logs a warning and leaves the previous snapshot in place;
//! the next tick tries again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::cache::{ReportCache, ReportSnapshot};
use crate::calendar;
use crate::config::{Config, Schedule};
use crate::db::DbState;
use crate::error::Result;
use crate::structured;

/// Rebuild all three structured reports for the current period and publish
/// them as one snapshot. Nothing is published unless every report builds.
pub fn refresh_reports(db: &DbState, config: &Config, cache: &ReportCache) -> Result<()> {
    let weekly = structured::generate_weekly(db, config, None)?;
    let monthly = structured::generate_monthly(db, config, None, None)?;
    let yearly = structured::generate_yearly(db, config, None)?;

    let run_at = Utc::now().to_rfc3339();
    cache.publish(ReportSnapshot {
        weekly,
        monthly,
        yearly,
        last_report_run_at: run_at.clone(),
    });

    info!(run_at = %run_at, "Reports refreshed");
    Ok(())
}

/// Time until the next occurrence of `schedule` in the zone: later today if
/// the wall-clock time has not passed yet, otherwise tomorrow.
pub fn next_run_delay(now: DateTime<Tz>, tz: Tz, schedule: Schedule) -> StdDuration {
    let offset =
        Duration::hours(i64::from(schedule.hour)) + Duration::minutes(i64::from(schedule.minute));
    let today = now.date_naive();
    let mut candidate = calendar::start_of_day(tz, today) + offset;
    if candidate <= now {
        let tomorrow = today.succ_opt().unwrap_or(today);
        candidate = calendar::start_of_day(tz, tomorrow) + offset;
    }
    (candidate - now)
        .to_std()
        .unwrap_or(StdDuration::from_secs(60))
}

pub struct SchedulerHandle {
    is_running: Arc<AtomicBool>,
    handle: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn stop(self) {
        self.is_running.store(false, Ordering::SeqCst);
        self.handle.abort();
        info!("Report scheduler stopped");
    }
}

/// Spawn the daily refresh loop. The returned handle stops it.
pub fn start_report_scheduler(
    db: Arc<DbState>,
    config: Config,
    cache: Arc<ReportCache>,
) -> SchedulerHandle {
    let is_running = Arc::new(AtomicBool::new(true));
    let flag = is_running.clone();

    let handle = tokio::spawn(async move {
        let tz = config.timezone;
        loop {
            let delay = next_run_delay(calendar::now(tz), tz, config.schedule);
            info!(
                secs = delay.as_secs(),
                hour = config.schedule.hour,
                minute = config.schedule.minute,
                "Next report refresh scheduled"
            );
            tokio::time::sleep(delay).await;

            if !flag.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = refresh_reports(&db, &config, &cache) {
                warn!("Report refresh failed, keeping previous snapshot: {e}");
            }
        }
    });

    SchedulerHandle { is_running, handle }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workshops::create_workshop;
    use chrono::TimeZone;
    use rusqlite::Connection;

    fn test_db() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
        .expect("pragma setup");
        crate::db::run_migrations_for_test(&conn);
        DbState {
            conn: std::sync::Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        }
    }

    fn tz() -> Tz {
        "Africa/Algiers".parse().unwrap()
    }

    #[test]
    fn test_next_run_delay_later_today() {
        let now = tz().with_ymd_and_hms(2024, 5, 4, 7, 0, 0).unwrap();
        let delay = next_run_delay(now, tz(), Schedule { hour: 9, minute: 30 });
        assert_eq!(delay, StdDuration::from_secs(2 * 3600 + 30 * 60));
    }

    #[test]
    fn test_next_run_delay_rolls_to_tomorrow() {
        let now = tz().with_ymd_and_hms(2024, 5, 4, 10, 0, 0).unwrap();
        let delay = next_run_delay(now, tz(), Schedule { hour: 9, minute: 0 });
        assert_eq!(delay, StdDuration::from_secs(23 * 3600));
    }

    #[test]
    fn test_next_run_delay_exact_tick_rolls_over() {
        let now = tz().with_ymd_and_hms(2024, 5, 4, 9, 0, 0).unwrap();
        let delay = next_run_delay(now, tz(), Schedule { hour: 9, minute: 0 });
        assert_eq!(delay, StdDuration::from_secs(24 * 3600));
    }

    #[test]
    fn test_refresh_publishes_snapshot() {
        let db = test_db();
        let cfg = Config::default();
        let cache = ReportCache::new();
        create_workshop(&db, "North").unwrap();

        refresh_reports(&db, &cfg, &cache).expect("refresh");

        let snap = cache.snapshot().expect("snapshot published");
        assert_eq!(snap.weekly.workshops.len(), 1);
        assert_eq!(snap.monthly.workshops.len(), 1);
        assert_eq!(snap.yearly.workshops.len(), 1);
        assert!(!snap.last_report_run_at.is_empty());
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let db = test_db();
        let cfg = Config::default();
        let cache = ReportCache::new();
        create_workshop(&db, "North").unwrap();

        refresh_reports(&db, &cfg, &cache).expect("first refresh");
        let before = cache.snapshot().unwrap();

        db.conn
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE daily_entries")
            .unwrap();

        assert!(refresh_reports(&db, &cfg, &cache).is_err());

        let after = cache.snapshot().unwrap();
        assert_eq!(after.last_report_run_at, before.last_report_run_at);
    }

    #[tokio::test]
    async fn test_scheduler_starts_and_stops() {
        let db = Arc::new(test_db());
        let cache = Arc::new(ReportCache::new());
        let handle = start_report_scheduler(db, Config::default(), cache.clone());
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        handle.stop();
    }
}
