use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::entry::LedgerEntry;
use super::party::Party;
use super::period::BillingPeriod;

/// One display row of a bill: a ledger entry, or a holiday with no delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillLine {
    pub date: NaiveDate,
    pub entry: Option<LedgerEntry>,
    pub holiday: bool,
}

impl BillLine {
    pub(crate) fn from_entry(entry: LedgerEntry, holiday: bool) -> Self {
        Self {
            date: entry.date,
            entry: Some(entry),
            holiday,
        }
    }

    pub(crate) fn holiday(date: NaiveDate) -> Self {
        Self {
            date,
            entry: None,
            holiday: true,
        }
    }

    /// Synthetic rows stand in for holidays without a recorded entry.
    pub fn is_synthetic(&self) -> bool {
        self.entry.is_none()
    }

    pub fn amount(&self) -> Decimal {
        self.entry
            .as_ref()
            .map(|entry| entry.amount)
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarmerSummary {
    pub total_entries: usize,
    pub total_quantity: Decimal,
    pub morning_quantity: Decimal,
    pub evening_quantity: Decimal,
    pub total_amount: Decimal,
    /// Running payment total for the farmer, not limited to the period.
    pub total_paid: Decimal,
    /// May be negative when the farmer has been overpaid.
    pub balance_due: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub total_entries: usize,
    pub total_quantity: Decimal,
    pub total_amount: Decimal,
    pub holiday_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillSummary {
    Farmer(FarmerSummary),
    Customer(CustomerSummary),
}

impl BillSummary {
    pub fn total_amount(&self) -> Decimal {
        match self {
            BillSummary::Farmer(summary) => summary.total_amount,
            BillSummary::Customer(summary) => summary.total_amount,
        }
    }

    pub fn total_entries(&self) -> usize {
        match self {
            BillSummary::Farmer(summary) => summary.total_entries,
            BillSummary::Customer(summary) => summary.total_entries,
        }
    }

    pub fn total_quantity(&self) -> Decimal {
        match self {
            BillSummary::Farmer(summary) => summary.total_quantity,
            BillSummary::Customer(summary) => summary.total_quantity,
        }
    }

    pub fn as_farmer(&self) -> Option<&FarmerSummary> {
        match self {
            BillSummary::Farmer(summary) => Some(summary),
            BillSummary::Customer(_) => None,
        }
    }

    pub fn as_customer(&self) -> Option<&CustomerSummary> {
        match self {
            BillSummary::Customer(summary) => Some(summary),
            BillSummary::Farmer(_) => None,
        }
    }
}

/// Period-scoped statement for one party. Built only by the aggregator and read-only
/// afterwards; a changed ledger means a new bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bill {
    party: Party,
    period: BillingPeriod,
    lines: Vec<BillLine>,
    summary: BillSummary,
}

impl Bill {
    pub(crate) fn new(
        party: Party,
        period: BillingPeriod,
        lines: Vec<BillLine>,
        summary: BillSummary,
    ) -> Self {
        Self {
            party,
            period,
            lines,
            summary,
        }
    }

    pub fn party(&self) -> &Party {
        &self.party
    }

    pub fn period(&self) -> BillingPeriod {
        self.period
    }

    pub fn lines(&self) -> &[BillLine] {
        &self.lines
    }

    pub fn summary(&self) -> &BillSummary {
        &self.summary
    }

    /// Real ledger entries in display order, without synthetic holiday rows.
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.lines.iter().filter_map(|line| line.entry.as_ref())
    }

    pub fn contains_entry(&self, id: Uuid) -> bool {
        self.entries().any(|entry| entry.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn label(&self) -> String {
        self.period.label()
    }
}
