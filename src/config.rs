//! Environment-driven configuration for the Atelier Ledger.
//!
//! Recognized variables:
//! - `TIMEZONE`: IANA zone controlling all day-boundary and bucket-labeling
//!   math (default `Africa/Algiers`).
//! - `REPORT_SCHEDULE`: daily refresh time as `HH:MM`, interpreted in the
//!   configured timezone (default `09:00`).
//! - `ALLOW_AUTO_CREATE_WORKSHOPS`: whether an unknown workshop name in a
//!   bot-originated write implicitly creates the workshop (default `false`).
//!
//! Invalid values fall back to the defaults with a warning rather than
//! aborting startup.

use chrono_tz::Tz;
use tracing::warn;

pub const DEFAULT_TIMEZONE: &str = "Africa/Algiers";
pub const DEFAULT_SCHEDULE: &str = "09:00";

/// Wall-clock time of day for the daily report refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub hour: u32,
    pub minute: u32,
}

impl Schedule {
    /// Parse an `HH:MM` schedule string.
    pub fn parse(s: &str) -> Option<Schedule> {
        let (h, m) = s.trim().split_once(':')?;
        let hour: u32 = h.parse().ok()?;
        let minute: u32 = m.parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Schedule { hour, minute })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub timezone: Tz,
    pub schedule: Schedule,
    pub allow_auto_create_workshops: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timezone: DEFAULT_TIMEZONE.parse().unwrap_or(chrono_tz::UTC),
            schedule: Schedule { hour: 9, minute: 0 },
            allow_auto_create_workshops: false,
        }
    }
}

impl Config {
    /// Build a config from the process environment, falling back to defaults
    /// for anything missing or malformed.
    pub fn from_env() -> Config {
        let defaults = Config::default();

        let timezone = match std::env::var("TIMEZONE") {
            Ok(raw) => match raw.parse::<Tz>() {
                Ok(tz) => tz,
                Err(_) => {
                    warn!("Invalid TIMEZONE {raw:?}, using {DEFAULT_TIMEZONE}");
                    defaults.timezone
                }
            },
            Err(_) => defaults.timezone,
        };

        let schedule = match std::env::var("REPORT_SCHEDULE") {
            Ok(raw) => match Schedule::parse(&raw) {
                Some(s) => s,
                None => {
                    warn!("Invalid REPORT_SCHEDULE {raw:?}, using {DEFAULT_SCHEDULE}");
                    defaults.schedule
                }
            },
            Err(_) => defaults.schedule,
        };

        let allow_auto_create_workshops = std::env::var("ALLOW_AUTO_CREATE_WORKSHOPS")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(defaults.allow_auto_create_workshops);

        Config {
            timezone,
            schedule,
            allow_auto_create_workshops,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
