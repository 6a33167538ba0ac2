//! Turns a party's period-filtered ledger entries into a [`Bill`].

use rust_decimal::Decimal;
use tracing::debug;

use super::bill::{Bill, BillLine, BillSummary, CustomerSummary, FarmerSummary};
use super::entry::{LedgerEntry, Shift};
use super::holiday::HolidayRegister;
use super::party::{Party, PartyKind};
use super::period::BillingPeriod;

/// Extra inputs that depend on the kind of party being billed.
#[derive(Debug, Clone, Copy)]
pub enum BillInputs<'a> {
    Farmer { total_paid: Decimal },
    Customer { holidays: &'a HolidayRegister },
}

pub struct LedgerAggregator;

impl LedgerAggregator {
    /// Builds a bill for `party`. Entries must already be limited to the party and the
    /// period; this function does not filter them.
    pub fn aggregate(
        party: &Party,
        period: BillingPeriod,
        entries: &[LedgerEntry],
        inputs: BillInputs<'_>,
    ) -> Bill {
        match inputs {
            BillInputs::Farmer { total_paid } => {
                Self::farmer_bill(party, period, entries, total_paid)
            }
            BillInputs::Customer { holidays } => {
                Self::customer_bill(party, period, entries, holidays)
            }
        }
    }

    pub fn farmer_bill(
        party: &Party,
        period: BillingPeriod,
        entries: &[LedgerEntry],
        total_paid: Decimal,
    ) -> Bill {
        let sorted = sorted_by_date(entries);
        let mut summary = FarmerSummary {
            total_entries: sorted.len(),
            total_quantity: Decimal::ZERO,
            morning_quantity: Decimal::ZERO,
            evening_quantity: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            total_paid,
            balance_due: Decimal::ZERO,
        };
        for entry in &sorted {
            let quantity = entry.quantity();
            summary.total_amount += entry.amount;
            summary.total_quantity += quantity;
            match entry.detail.shift() {
                Some(Shift::Morning) => summary.morning_quantity += quantity,
                Some(Shift::Evening) => summary.evening_quantity += quantity,
                None => {}
            }
        }
        summary.balance_due = summary.total_amount - total_paid;
        debug!(
            party = %party.id,
            period = %period,
            entries = summary.total_entries,
            total = %summary.total_amount,
            "aggregated farmer bill"
        );

        let lines = sorted
            .into_iter()
            .map(|entry| BillLine::from_entry(entry, false))
            .collect();
        Bill::new(party.clone(), period, lines, BillSummary::Farmer(summary))
    }

    pub fn customer_bill(
        party: &Party,
        period: BillingPeriod,
        entries: &[LedgerEntry],
        holidays: &HolidayRegister,
    ) -> Bill {
        let sorted = sorted_by_date(entries);
        let mut summary = CustomerSummary {
            total_entries: sorted.len(),
            total_quantity: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            holiday_count: holidays.count_within(&period),
        };
        for entry in &sorted {
            summary.total_amount += entry.amount;
            summary.total_quantity += entry.quantity();
        }

        let uncovered: Vec<_> = holidays
            .within(&period)
            .filter(|day| !sorted.iter().any(|entry| entry.date == *day))
            .collect();
        let mut lines: Vec<BillLine> = sorted
            .into_iter()
            .map(|entry| {
                let holiday = holidays.contains(entry.date);
                BillLine::from_entry(entry, holiday)
            })
            .collect();
        lines.extend(uncovered.into_iter().map(BillLine::holiday));
        lines.sort_by_key(|line| line.date);
        debug!(
            party = %party.id,
            period = %period,
            entries = summary.total_entries,
            holidays = summary.holiday_count,
            total = %summary.total_amount,
            "aggregated customer bill"
        );

        Bill::new(party.clone(), period, lines, BillSummary::Customer(summary))
    }

    /// Inputs matching the party kind, for callers that hold both values.
    pub fn inputs_for<'a>(
        kind: PartyKind,
        total_paid: Decimal,
        holidays: &'a HolidayRegister,
    ) -> BillInputs<'a> {
        match kind {
            PartyKind::Farmer => BillInputs::Farmer { total_paid },
            PartyKind::Customer => BillInputs::Customer { holidays },
        }
    }
}

/// Stable sort so entries sharing a date keep their arrival order.
fn sorted_by_date(entries: &[LedgerEntry]) -> Vec<LedgerEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|entry| entry.date);
    sorted
}
