use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::mutation::{GenerateOutcome, MutationOp, WriteReport};
use crate::config::BillingConfig;
use crate::errors::{BillingError, Result};
use crate::ledger::{
    Bill, BillingPeriod, EntryExpander, HolidayRegister, LedgerAggregator, LedgerEntry, NewEntry,
    Party, PartyKind, PeriodKind, PeriodResolver, PeriodSelection,
};
use crate::storage::LedgerStore;

/// Lifecycle of a [`BillSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No bill requested for the current selection.
    Idle,
    Loading,
    /// A bill for the current selection is available.
    Ready,
    /// A ledger write is in flight.
    Mutating,
    /// The last fetch failed; the previous bill, if any, is kept.
    Error,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Mutating => "mutating",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
struct SessionInner {
    tab: PartyKind,
    party: Option<Party>,
    selection: PeriodSelection,
    holidays: HolidayRegister,
    reference: Option<NaiveDate>,
    bill: Option<Arc<Bill>>,
    state: SessionState,
    token: u64,
    last_error: Option<BillingError>,
}

impl SessionInner {
    fn reference_date(&self) -> NaiveDate {
        self.reference.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Invalidates in-flight requests and the shown bill.
    fn invalidate(&mut self) {
        self.token += 1;
        self.bill = None;
        self.last_error = None;
        self.state = SessionState::Idle;
    }

    fn begin_generation(&mut self) -> Result<Ticket> {
        let party = self.party.clone().ok_or(BillingError::PartyNotSelected)?;
        let period = PeriodResolver::resolve(&self.selection, self.reference_date())?;
        self.token += 1;
        self.state = SessionState::Loading;
        Ok(Ticket {
            token: self.token,
            party,
            period,
        })
    }
}

/// Snapshot of the request a fetch belongs to.
struct Ticket {
    token: u64,
    party: Party,
    period: BillingPeriod,
}

/// Coordinates party and period selection, bill generation, and ledger mutations for one
/// billing screen.
///
/// Every fetch carries a request token. Responses whose token is no longer current are
/// dropped, so a slow response for an old selection never replaces a newer bill. The
/// internal lock is released before every store call.
pub struct BillSession {
    store: Arc<dyn LedgerStore>,
    inner: Mutex<SessionInner>,
}

impl BillSession {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(SessionInner {
                tab: PartyKind::Farmer,
                party: None,
                selection: PeriodSelection::default(),
                holidays: HolidayRegister::new(),
                reference: None,
                bill: None,
                state: SessionState::Idle,
                token: 0,
                last_error: None,
            }),
        }
    }

    /// Session preselecting the configured period kind. A custom default has no bounds
    /// yet, so it starts as monthly.
    pub fn from_config(store: Arc<dyn LedgerStore>, config: &BillingConfig) -> Self {
        let session = Self::new(store);
        let selection = match config.default_period {
            PeriodKind::Monthly => PeriodSelection::Monthly,
            PeriodKind::Fortnightly => PeriodSelection::Fortnightly,
            PeriodKind::Custom => {
                debug!("custom default period has no bounds; starting monthly");
                PeriodSelection::Monthly
            }
        };
        session.lock().selection = selection;
        session
    }

    /// Pins "today" for period resolution instead of reading the local clock.
    pub fn with_reference_date(self, reference: NaiveDate) -> Self {
        self.lock().reference = Some(reference);
        self
    }

    pub fn set_reference_date(&self, reference: Option<NaiveDate>) {
        let mut inner = self.lock();
        if inner.reference != reference {
            inner.reference = reference;
            inner.invalidate();
        }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.lock().reference_date()
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn tab(&self) -> PartyKind {
        self.lock().tab
    }

    pub fn party(&self) -> Option<Party> {
        self.lock().party.clone()
    }

    pub fn selection(&self) -> PeriodSelection {
        self.lock().selection
    }

    /// Last bill successfully generated for the current selection.
    pub fn bill(&self) -> Option<Arc<Bill>> {
        self.lock().bill.clone()
    }

    pub fn last_error(&self) -> Option<BillingError> {
        self.lock().last_error.clone()
    }

    pub fn holidays(&self) -> HolidayRegister {
        self.lock().holidays.clone()
    }

    /// Period the current selection resolves to today.
    pub fn current_period(&self) -> Result<BillingPeriod> {
        let inner = self.lock();
        PeriodResolver::resolve(&inner.selection, inner.reference_date())
    }

    /// Selects the party to bill. Picking a party of the other kind switches tabs, which
    /// clears the holiday register.
    pub fn select_party(&self, party: Party) {
        let mut inner = self.lock();
        if inner.party.as_ref() == Some(&party) {
            return;
        }
        if party.kind != inner.tab {
            inner.tab = party.kind;
            inner.holidays.clear();
        }
        info!(party = %party.id, kind = %party.kind, "party selected");
        inner.party = Some(party);
        inner.invalidate();
    }

    pub fn select_period(&self, selection: PeriodSelection) {
        let mut inner = self.lock();
        if inner.selection == selection {
            return;
        }
        debug!(kind = ?selection.kind(), "period selected");
        inner.selection = selection;
        inner.invalidate();
    }

    /// Moves to the farmer or customer tab, dropping the party and holidays.
    pub fn switch_tab(&self, kind: PartyKind) {
        let mut inner = self.lock();
        if inner.tab == kind {
            return;
        }
        debug!(from = %inner.tab, to = %kind, "switching tab");
        inner.tab = kind;
        inner.party = None;
        inner.holidays.clear();
        inner.invalidate();
    }

    /// Back to a fresh session on the same tab; the pinned reference date is kept.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.party = None;
        inner.selection = PeriodSelection::default();
        inner.holidays.clear();
        inner.invalidate();
    }

    /// Returns false if the date was already marked. Takes effect on the next generation.
    pub fn mark_holiday(&self, date: NaiveDate) -> bool {
        self.lock().holidays.mark(date)
    }

    pub fn unmark_holiday(&self, date: NaiveDate) -> bool {
        self.lock().holidays.unmark(date)
    }

    /// Returns whether the date is a holiday afterwards.
    pub fn toggle_holiday(&self, date: NaiveDate) -> bool {
        self.lock().holidays.toggle(date)
    }

    pub fn clear_holidays(&self) {
        self.lock().holidays.clear();
    }

    /// Fetches entries for the current party and period and rebuilds the bill.
    ///
    /// Calling again while a fetch is in flight supersedes the earlier call. Rejected
    /// while a mutation is being written.
    pub async fn generate(&self) -> Result<GenerateOutcome> {
        let ticket = {
            let mut inner = self.lock();
            if inner.state == SessionState::Mutating {
                return Err(BillingError::InvalidState(inner.state));
            }
            match inner.begin_generation() {
                Ok(ticket) => ticket,
                Err(err) => {
                    inner.last_error = Some(err.clone());
                    return Err(err);
                }
            }
        };
        self.run_generation(ticket).await
    }

    /// Same as [`BillSession::generate`].
    pub async fn refresh(&self) -> Result<GenerateOutcome> {
        self.generate().await
    }

    /// Writes `op` to the store and regenerates the bill from the store.
    ///
    /// Requires a shown bill. If the write fails the previous bill stays and the error is
    /// returned. Repeated entries are written one at a time; when only some succeed the
    /// bill is regenerated and `PartialExpansionFailure` reports the counts.
    ///
    /// If the selection changed while the write was in flight, the newer bill for the same
    /// party is regenerated so it includes the write; otherwise `Superseded` is returned.
    pub async fn apply_mutation(&self, op: MutationOp) -> Result<GenerateOutcome> {
        let (token, party) = {
            let mut inner = self.lock();
            if inner.state != SessionState::Ready {
                return Err(BillingError::InvalidState(inner.state));
            }
            let party = inner.party.clone().ok_or(BillingError::PartyNotSelected)?;
            inner.state = SessionState::Mutating;
            (inner.token, party)
        };
        info!(party = %party.id, op = op.label(), "applying ledger mutation");

        let written = self.write(&party, op).await;

        let (ticket, report) = {
            let mut inner = self.lock();
            let current = inner.token == token;
            let report = match written {
                Ok(report) => report,
                Err(err) => {
                    warn!(party = %party.id, error = %err, "ledger mutation failed");
                    if current {
                        inner.state = SessionState::Ready;
                        inner.last_error = Some(err.clone());
                    }
                    return Err(err);
                }
            };
            if !current {
                let same_party = inner.party.as_ref().map(|shown| shown.id) == Some(party.id);
                let showing = matches!(inner.state, SessionState::Ready | SessionState::Loading);
                if !(same_party && showing) {
                    debug!(
                        party = %party.id,
                        "selection changed during write; skipping regeneration"
                    );
                    return report.into_result().map(|_| GenerateOutcome::Superseded);
                }
                debug!(
                    party = %party.id,
                    state = %inner.state,
                    "selection changed during write; refreshing the newer bill"
                );
            }
            match inner.begin_generation() {
                Ok(ticket) => (ticket, report),
                Err(err) => {
                    inner.state = SessionState::Error;
                    inner.last_error = Some(err.clone());
                    return Err(err);
                }
            }
        };

        let outcome = match self.run_generation(ticket).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if report.failed() > 0 {
                    warn!(
                        failed = report.failed(),
                        attempted = report.attempted,
                        "regeneration failed after partial expansion"
                    );
                }
                return Err(err);
            }
        };
        report.into_result()?;
        Ok(outcome)
    }

    async fn write(&self, party: &Party, op: MutationOp) -> Result<WriteReport> {
        match op {
            MutationOp::Add(fields) => {
                self.store.create_entry(party.kind, party.id, fields).await?;
                Ok(WriteReport::single())
            }
            MutationOp::AddRepeated {
                template,
                start,
                repeat,
            } => {
                let entries = EntryExpander::expand(&template, start, repeat)?;
                let report = self.write_expanded(party, entries).await;
                if report.succeeded == 0 {
                    return Err(BillingError::PartialExpansionFailure {
                        attempted: report.attempted,
                        succeeded: 0,
                        failed: report.failed(),
                    });
                }
                Ok(report)
            }
            MutationOp::Edit { id, patch } => {
                self.store.update_entry(id, patch).await?;
                Ok(WriteReport::single())
            }
            MutationOp::Delete(id) => {
                self.store.delete_entry(id).await?;
                Ok(WriteReport::single())
            }
        }
    }

    /// Creates expanded entries in date order, continuing past failures.
    async fn write_expanded(&self, party: &Party, entries: Vec<NewEntry>) -> WriteReport {
        let attempted = entries.len();
        let mut succeeded = 0;
        for fields in entries {
            let date = fields.date;
            match self.store.create_entry(party.kind, party.id, fields).await {
                Ok(_) => succeeded += 1,
                Err(err) => {
                    warn!(party = %party.id, %date, error = %err, "repeated entry not written")
                }
            }
        }
        WriteReport {
            attempted,
            succeeded,
        }
    }

    async fn run_generation(&self, ticket: Ticket) -> Result<GenerateOutcome> {
        debug!(
            token = ticket.token,
            party = %ticket.party.id,
            period = %ticket.period,
            "fetching ledger entries"
        );
        let fetched = self.fetch(&ticket).await;

        let mut inner = self.lock();
        if inner.token != ticket.token {
            debug!(
                token = ticket.token,
                latest = inner.token,
                "discarding superseded bill response"
            );
            return Ok(GenerateOutcome::Superseded);
        }
        match fetched {
            Ok((entries, total_paid)) => {
                let inputs =
                    LedgerAggregator::inputs_for(ticket.party.kind, total_paid, &inner.holidays);
                let bill = Arc::new(LedgerAggregator::aggregate(
                    &ticket.party,
                    ticket.period,
                    &entries,
                    inputs,
                ));
                info!(
                    party = %ticket.party.id,
                    period = %ticket.period,
                    entries = bill.summary().total_entries(),
                    total = %bill.summary().total_amount(),
                    "bill generated"
                );
                inner.bill = Some(Arc::clone(&bill));
                inner.state = SessionState::Ready;
                inner.last_error = None;
                Ok(GenerateOutcome::Updated(bill))
            }
            Err(err) => {
                warn!(party = %ticket.party.id, error = %err, "bill generation failed");
                inner.state = SessionState::Error;
                inner.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn fetch(&self, ticket: &Ticket) -> Result<(Vec<LedgerEntry>, Decimal)> {
        let party = &ticket.party;
        let period = ticket.period;
        let mut entries = self
            .store
            .list_entries(party.kind, party.id, period.start(), period.end())
            .await?;
        let listed = entries.len();
        entries.retain(|entry| entry.party_id == party.id && period.contains(entry.date));
        if entries.len() != listed {
            warn!(
                party = %party.id,
                dropped = listed - entries.len(),
                "store returned entries outside the requested party or period"
            );
        }
        let total_paid = match party.kind {
            PartyKind::Farmer => self.store.party_payments_total(party.id).await?,
            PartyKind::Customer => Decimal::ZERO,
        };
        Ok((entries, total_paid))
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
