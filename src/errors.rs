use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::session::SessionState;

/// Error type that captures billing, expansion, and ledger store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("Invalid range: end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("Custom period requires both a start and an end date")]
    MissingCustomBounds,
    #[error("No farmer or customer selected")]
    PartyNotSelected,
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),
    #[error("Ledger store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("{failed} of {attempted} repeated entries failed to write ({succeeded} written)")]
    PartialExpansionFailure {
        attempted: usize,
        succeeded: usize,
        failed: usize,
    },
    #[error("Entry not found: {0}")]
    EntryNotFound(Uuid),
    #[error("Party not found: {0}")]
    PartyNotFound(Uuid),
    #[error("Rejected by ledger store: {0}")]
    Rejected(String),
    #[error("Operation not allowed while session is {0}")]
    InvalidState(SessionState),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BillingError>;

impl BillingError {
    /// True for failures caused by the transport or persistence layer rather than input.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BillingError::StoreUnavailable(_) | BillingError::Storage(_)
        )
    }
}

impl From<std::io::Error> for BillingError {
    fn from(err: std::io::Error) -> Self {
        BillingError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::Storage(err.to_string())
    }
}
