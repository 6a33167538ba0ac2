//! The ledger store seam and two reference backends.

pub mod book;
pub mod json_backend;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::Result;
use crate::ledger::{EntryPatch, LedgerEntry, NewEntry, PartyKind};

pub use book::LedgerBook;
pub use json_backend::JsonLedgerStore;
pub use memory::MemoryLedgerStore;

/// System of record for collections, sales, and payments.
///
/// Implementations report transport failures as `StoreUnavailable`, unknown ids as
/// `EntryNotFound`/`PartyNotFound`, and validation failures as `Rejected`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Entries of one party dated within `start..=end`, in arrival order.
    async fn list_entries(
        &self,
        kind: PartyKind,
        party_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LedgerEntry>>;

    /// Records a new entry; the store assigns its id and amount.
    async fn create_entry(
        &self,
        kind: PartyKind,
        party_id: Uuid,
        fields: NewEntry,
    ) -> Result<LedgerEntry>;

    async fn update_entry(&self, entry_id: Uuid, patch: EntryPatch) -> Result<LedgerEntry>;

    async fn delete_entry(&self, entry_id: Uuid) -> Result<()>;

    /// Everything ever paid to the party, regardless of period.
    async fn party_payments_total(&self, party_id: Uuid) -> Result<Decimal>;
}
