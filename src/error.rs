//! Error types for the Atelier Ledger.
//!
//! Three failure kinds cross the crate boundary: validation failures are
//! rejected before any store access, not-found lookups are distinct from
//! empty results, and store failures surface as-is so callers (notably the
//! report scheduler) can decide whether to keep stale state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input: negative amounts, malformed date strings, unknown
    /// period names. Never retried.
    #[error("validation: {0}")]
    Validation(String),

    /// A referenced workshop or daily entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The ledger store could not be reached or a query failed.
    #[error("store: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Store(e.to_string())
    }
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        LedgerError::NotFound(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}
