use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{LedgerBook, LedgerStore};
use crate::errors::{BillingError, Result};
use crate::ledger::{EntryPatch, LedgerEntry, NewEntry, Party, PartyKind, Payment};

/// Ledger store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    book: Mutex<LedgerBook>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_book(book: LedgerBook) -> Self {
        Self {
            book: Mutex::new(book),
        }
    }

    pub fn add_party(&self, party: Party) -> Result<Uuid> {
        Ok(self.lock()?.upsert_party(party))
    }

    pub fn record_payment(&self, payment: Payment) -> Result<Payment> {
        self.lock()?.record_payment(payment)
    }

    /// Copy of the current book contents.
    pub fn snapshot(&self) -> Result<LedgerBook> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerBook>> {
        self.book
            .lock()
            .map_err(|_| BillingError::StoreUnavailable("ledger book lock poisoned".into()))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
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
        self.lock()?.create_entry(kind, party_id, fields)
    }

    async fn update_entry(&self, entry_id: Uuid, patch: EntryPatch) -> Result<LedgerEntry> {
        self.lock()?.update_entry(entry_id, &patch)
    }

    async fn delete_entry(&self, entry_id: Uuid) -> Result<()> {
        self.lock()?.delete_entry(entry_id).map(|_| ())
    }

    async fn party_payments_total(&self, party_id: Uuid) -> Result<Decimal> {
        Ok(self.lock()?.payments_total(party_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{CollectionDetail, EntryDetail, MilkType, Shift};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn morning_cow(quantity: Decimal) -> EntryDetail {
        EntryDetail::Collection(CollectionDetail {
            shift: Shift::Morning,
            milk_type: MilkType::Cow,
            quantity,
            fat: dec!(3.8),
            snf: dec!(8.3),
            rate: dec!(38.50),
        })
    }

    #[tokio::test]
    async fn create_update_delete_flow() {
        let store = MemoryLedgerStore::new();
        let farmer = store.add_party(Party::farmer("Vijay")).unwrap();

        let created = store
            .create_entry(
                PartyKind::Farmer,
                farmer,
                NewEntry::new(date(2024, 2, 1), morning_cow(dec!(10))),
            )
            .await
            .unwrap();
        assert_eq!(created.amount, dec!(385.00));

        let updated = store
            .update_entry(created.id, EntryPatch::default().with_quantity(dec!(12)))
            .await
            .unwrap();
        assert_eq!(updated.amount, dec!(462.00));

        store.delete_entry(created.id).await.unwrap();
        let listed = store
            .list_entries(PartyKind::Farmer, farmer, date(2024, 2, 1), date(2024, 2, 29))
            .await
            .unwrap();
        assert!(listed.is_empty());
        assert_eq!(
            store.delete_entry(created.id).await.unwrap_err(),
            BillingError::EntryNotFound(created.id)
        );
    }

    #[tokio::test]
    async fn payments_total_comes_from_recorded_payments() {
        let store = MemoryLedgerStore::new();
        let farmer = store.add_party(Party::farmer("Asha")).unwrap();
        store
            .record_payment(Payment::new(farmer, date(2024, 1, 31), dec!(1200)))
            .unwrap();
        assert_eq!(store.party_payments_total(farmer).await.unwrap(), dec!(1200));
    }
}
