//! In-memory report cache.
//!
//! Readers always see the last fully built snapshot: weekly, monthly, and
//! yearly reports plus the instant they were generated. Publication swaps
//! the whole snapshot at once, so a refresh that fails partway through
//! never leaves a mixed state behind.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::structured::{MonthlyReport, WeeklyReport, YearlyReport};

/// One complete refresh result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    pub weekly: WeeklyReport,
    pub monthly: MonthlyReport,
    pub yearly: YearlyReport,
    /// RFC3339 UTC instant of the refresh that produced this snapshot.
    pub last_report_run_at: String,
}

#[derive(Debug, Default)]
pub struct ReportCache {
    inner: RwLock<Option<Arc<ReportSnapshot>>>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached snapshot wholesale.
    pub fn publish(&self, snapshot: ReportSnapshot) {
        let mut slot = match self.inner.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(Arc::new(snapshot));
    }

    /// The last published snapshot, if any refresh has completed yet.
    pub fn snapshot(&self) -> Option<Arc<ReportSnapshot>> {
        let slot = match self.inner.read() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.clone()
    }

    /// RFC3339 instant of the last successful refresh.
    pub fn last_report_run_at(&self) -> Option<String> {
        self.snapshot().map(|s| s.last_report_run_at.clone())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
