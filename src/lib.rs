//! Atelier Ledger: a workshop debt and payment ledger with a
//! calendar-aligned reporting engine.
//!
//! The ledger records one row per (workshop, day): orders taken, debt
//! incurred, and amounts paid, all day-bucketed in a configured IANA
//! timezone with a Saturday-start business week. On top of it sit flat
//! summaries, an outstanding-debts view, and structured weekly/monthly/
//! yearly report grids, refreshed daily by a background scheduler into an
//! in-memory cache.

pub mod aggregate;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod report;
pub mod scheduler;
pub mod structured;
pub mod workshops;

pub use cache::{ReportCache, ReportSnapshot};
pub use config::Config;
pub use db::DbState;
pub use error::{LedgerError, Result};
