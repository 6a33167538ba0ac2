use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::{BillingError, Result};
use crate::ledger::{Bill, EntryDetail, EntryPatch, NewEntry};

/// A ledger change routed through [`super::BillSession::apply_mutation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOp {
    Add(NewEntry),
    /// One entry per day for `repeat` consecutive days (clamped to 1..=31).
    AddRepeated {
        template: EntryDetail,
        start: NaiveDate,
        repeat: u32,
    },
    Edit {
        id: Uuid,
        patch: EntryPatch,
    },
    Delete(Uuid),
}

impl MutationOp {
    pub fn label(&self) -> &'static str {
        match self {
            MutationOp::Add(_) => "add",
            MutationOp::AddRepeated { .. } => "add_repeated",
            MutationOp::Edit { .. } => "edit",
            MutationOp::Delete(_) => "delete",
        }
    }
}

/// Result of a bill generation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// The session now shows this bill.
    Updated(Arc<Bill>),
    /// A newer selection or request replaced this one; its response was dropped.
    Superseded,
}

impl GenerateOutcome {
    pub fn bill(&self) -> Option<&Arc<Bill>> {
        match self {
            GenerateOutcome::Updated(bill) => Some(bill),
            GenerateOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, GenerateOutcome::Superseded)
    }
}

/// Counts for the store writes issued by one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WriteReport {
    pub attempted: usize,
    pub succeeded: usize,
}

impl WriteReport {
    pub fn single() -> Self {
        Self {
            attempted: 1,
            succeeded: 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn into_result(self) -> Result<()> {
        if self.failed() == 0 {
            return Ok(());
        }
        Err(BillingError::PartialExpansionFailure {
            attempted: self.attempted,
            succeeded: self.succeeded,
            failed: self.failed(),
        })
    }
}
