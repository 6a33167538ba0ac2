use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BillingError, Result};
use crate::ledger::{EntryDetail, EntryPatch, LedgerEntry, NewEntry, Party, PartyKind, Payment};

/// Parties, entries, and payments held by the reference stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBook {
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl LedgerBook {
    pub fn party(&self, id: Uuid) -> Option<&Party> {
        self.parties.iter().find(|party| party.id == id)
    }

    pub fn entry(&self, id: Uuid) -> Option<&LedgerEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Adds or replaces a party by id.
    pub fn upsert_party(&mut self, party: Party) -> Uuid {
        let id = party.id;
        match self.parties.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = party,
            None => self.parties.push(party),
        }
        id
    }

    pub fn record_payment(&mut self, payment: Payment) -> Result<Payment> {
        let party = self
            .party(payment.party_id)
            .ok_or(BillingError::PartyNotFound(payment.party_id))?;
        if party.kind != PartyKind::Farmer {
            return Err(BillingError::Rejected(format!(
                "payments are recorded for farmers, `{}` is a {}",
                party.name, party.kind
            )));
        }
        if payment.amount.is_sign_negative() && !payment.amount.is_zero() {
            return Err(BillingError::Rejected("payment amount must not be negative".into()));
        }
        self.payments.push(payment.clone());
        Ok(payment)
    }

    pub fn list_entries(
        &self,
        kind: PartyKind,
        party_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                entry.party_id == party_id
                    && entry.party_kind() == kind
                    && entry.date >= start
                    && entry.date <= end
            })
            .cloned()
            .collect()
    }

    pub fn create_entry(
        &mut self,
        kind: PartyKind,
        party_id: Uuid,
        fields: NewEntry,
    ) -> Result<LedgerEntry> {
        let party = self
            .party(party_id)
            .ok_or(BillingError::PartyNotFound(party_id))?;
        if party.kind != kind {
            return Err(BillingError::Rejected(format!(
                "`{}` is a {}, not a {}",
                party.name, party.kind, kind
            )));
        }
        validate_detail(kind, &fields.detail)?;
        let entry = LedgerEntry::from_new(party_id, fields)?;
        self.entries.push(entry.clone());
        Ok(entry)
    }

    pub fn update_entry(&mut self, entry_id: Uuid, patch: &EntryPatch) -> Result<LedgerEntry> {
        let slot = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .ok_or(BillingError::EntryNotFound(entry_id))?;
        let updated = patch.applied_to(slot)?;
        validate_detail(updated.party_kind(), &updated.detail)?;
        *slot = updated.clone();
        Ok(updated)
    }

    pub fn delete_entry(&mut self, entry_id: Uuid) -> Result<LedgerEntry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == entry_id)
            .ok_or(BillingError::EntryNotFound(entry_id))?;
        Ok(self.entries.remove(index))
    }

    pub fn payments_total(&self, party_id: Uuid) -> Decimal {
        self.payments
            .iter()
            .filter(|payment| payment.party_id == party_id)
            .map(|payment| payment.amount)
            .sum()
    }
}

fn validate_detail(kind: PartyKind, detail: &EntryDetail) -> Result<()> {
    if detail.party_kind() != kind {
        return Err(BillingError::Rejected(format!(
            "a {} cannot hold this kind of entry",
            kind
        )));
    }
    if let Some(field) = detail.negative_field() {
        return Err(BillingError::Rejected(format!("{field} must not be negative")));
    }
    if detail.computed_amount().is_none() {
        return Err(BillingError::Rejected("amount out of range".into()));
    }
    Ok(())
}
