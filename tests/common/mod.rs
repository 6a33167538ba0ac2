#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use dairy_billing::{
    ledger::{EntryPatch, LedgerEntry, NewEntry, Party, PartyKind},
    BillingError, JsonLedgerStore, LedgerStore, MemoryLedgerStore, Result,
};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid calendar date")
}

/// Path to a ledger file inside a directory that outlives the test.
pub fn temp_ledger_path() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join("ledger.json");
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn json_store() -> (Arc<JsonLedgerStore>, PathBuf) {
    let path = temp_ledger_path();
    let store = JsonLedgerStore::open(&path).expect("open json ledger store");
    (Arc::new(store), path)
}

/// Memory store whose failures and timing can be steered from a test.
#[derive(Default)]
pub struct ControlledStore {
    pub inner: MemoryLedgerStore,
    fail_lists: AtomicBool,
    fail_writes: AtomicBool,
    failing_create_dates: Mutex<HashSet<NaiveDate>>,
    list_gates: Mutex<VecDeque<Arc<Notify>>>,
    create_gates: Mutex<VecDeque<Arc<Notify>>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl ControlledStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_party(&self, party: Party) -> Party {
        self.inner.add_party(party.clone()).expect("add party");
        party
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `create_entry` fail for entries dated `date`.
    pub fn fail_create_on(&self, date: NaiveDate) {
        self.failing_create_dates
            .lock()
            .expect("lock failing dates")
            .insert(date);
    }

    /// The next `list_entries` call waits until the returned handle is notified.
    pub fn hold_next_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.list_gates
            .lock()
            .expect("lock list gates")
            .push_back(gate.clone());
        gate
    }

    /// The next `create_entry` call waits until the returned handle is notified.
    pub fn hold_next_create(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.create_gates
            .lock()
            .expect("lock create gates")
            .push_back(gate.clone());
        gate
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn stored_entries(&self) -> Vec<LedgerEntry> {
        self.inner.snapshot().expect("snapshot").entries
    }

    fn unavailable() -> BillingError {
        BillingError::StoreUnavailable("connection reset".into())
    }
}

#[async_trait]
impl LedgerStore for ControlledStore {
    async fn list_entries(
        &self,
        kind: PartyKind,
        party_id: uuid::Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LedgerEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.list_gates.lock().expect("lock list gates").pop_front();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.list_entries(kind, party_id, start, end).await
    }

    async fn create_entry(
        &self,
        kind: PartyKind,
        party_id: uuid::Uuid,
        fields: NewEntry,
    ) -> Result<LedgerEntry> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .create_gates
            .lock()
            .expect("lock create gates")
            .pop_front();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failing = self
            .failing_create_dates
            .lock()
            .expect("lock failing dates")
            .contains(&fields.date);
        if failing || self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.create_entry(kind, party_id, fields).await
    }

    async fn update_entry(&self, entry_id: uuid::Uuid, patch: EntryPatch) -> Result<LedgerEntry> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.update_entry(entry_id, patch).await
    }

    async fn delete_entry(&self, entry_id: uuid::Uuid) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.delete_entry(entry_id).await
    }

    async fn party_payments_total(&self, party_id: uuid::Uuid) -> Result<Decimal> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.party_payments_total(party_id).await
    }
}
