//! Billing domain models and the pure period/expansion/aggregation helpers.

pub mod aggregator;
pub mod bill;
pub mod entry;
pub mod expander;
pub mod holiday;
pub mod party;
pub mod payment;
pub mod period;

pub use aggregator::{BillInputs, LedgerAggregator};
pub use bill::{Bill, BillLine, BillSummary, CustomerSummary, FarmerSummary};
pub use entry::{
    CollectionDetail, EntryDetail, EntryPatch, LedgerEntry, MilkType, NewEntry, Product,
    SaleDetail, Shift,
};
pub use expander::{EntryExpander, MAX_REPEAT_DAYS, MIN_REPEAT_DAYS};
pub use holiday::HolidayRegister;
pub use party::{Party, PartyKind};
pub use payment::{Payment, PaymentMode};
pub use period::{BillingPeriod, PeriodKind, PeriodResolver, PeriodSelection};
