use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{LedgerBook, LedgerStore};
use crate::errors::{BillingError, Result};
use crate::ledger::{EntryPatch, LedgerEntry, NewEntry, Party, PartyKind, Payment};
use crate::utils::write_atomic;

/// Ledger store persisted as a single JSON document. Every successful write is staged
/// and renamed into place before it becomes visible to readers.
#[derive(Debug)]
pub struct JsonLedgerStore {
    path: PathBuf,
    book: Mutex<LedgerBook>,
}

impl JsonLedgerStore {
    /// Opens the book at `path`; a missing file starts an empty book.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let book = load_book(&path)?;
        debug!(
            path = %path.display(),
            parties = book.parties.len(),
            entries = book.entries.len(),
            "opened json ledger store"
        );
        Ok(Self {
            path,
            book: Mutex::new(book),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file, picking up changes made by other processes.
    pub fn reload(&self) -> Result<()> {
        let book = load_book(&self.path)?;
        *self.lock()? = book;
        Ok(())
    }

    pub fn add_party(&self, party: Party) -> Result<Uuid> {
        self.commit(|book| Ok(book.upsert_party(party)))
    }

    pub fn record_payment(&self, payment: Payment) -> Result<Payment> {
        self.commit(|book| book.record_payment(payment))
    }

    pub fn snapshot(&self) -> Result<LedgerBook> {
        Ok(self.lock()?.clone())
    }

    /// Applies `change` to a draft, persists the draft, then publishes it. A failed save
    /// leaves the in-memory book untouched.
    fn commit<T>(&self, change: impl FnOnce(&mut LedgerBook) -> Result<T>) -> Result<T> {
        let mut guard = self.lock()?;
        let mut draft = guard.clone();
        let outcome = change(&mut draft)?;
        save_book(&self.path, &draft).map_err(|err| {
            warn!(path = %self.path.display(), error = %err, "failed to persist ledger book");
            BillingError::StoreUnavailable(err.to_string())
        })?;
        *guard = draft;
        Ok(outcome)
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerBook>> {
        self.book
            .lock()
            .map_err(|_| BillingError::StoreUnavailable("ledger book lock poisoned".into()))
    }
}

#[async_trait]
impl LedgerStore for JsonLedgerStore {
    async fn list_entries(
        &self,
        kind: PartyKind,
        party_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LedgerEntry>> {
        Ok(self.lock()?.list_entries(kind, party_id, start, end))
    }

    async fn create_entry(
        &self,
        kind: PartyKind,
        party_id: Uuid,
        fields: NewEntry,
    ) -> Result<LedgerEntry> {
        self.commit(|book| book.create_entry(kind, party_id, fields))
    }

    async fn update_entry(&self, entry_id: Uuid, patch: EntryPatch) -> Result<LedgerEntry> {
        self.commit(|book| book.update_entry(entry_id, &patch))
    }

    async fn delete_entry(&self, entry_id: Uuid) -> Result<()> {
        self.commit(|book| book.delete_entry(entry_id).map(|_| ()))
    }

    async fn party_payments_total(&self, party_id: Uuid) -> Result<Decimal> {
        Ok(self.lock()?.payments_total(party_id))
    }
}

pub fn save_book(path: &Path, book: &LedgerBook) -> Result<()> {
    let json = serde_json::to_string_pretty(book)?;
    write_atomic(path, &json)
}

pub fn load_book(path: &Path) -> Result<LedgerBook> {
    if !path.exists() {
        return Ok(LedgerBook::default());
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
