#![doc(test(attr(deny(warnings))))]

//! Dairy Billing resolves billing periods, expands repeated ledger entries, and
//! aggregates farmer and customer ledgers into bills backed by a pluggable store.

pub mod config;
pub mod errors;
pub mod ledger;
pub mod session;
pub mod storage;
pub mod utils;

pub use crate::config::{BillingConfig, ConfigManager};
pub use crate::errors::{BillingError, Result};
pub use crate::session::{BillSession, GenerateOutcome, MutationOp, SessionState};
pub use crate::storage::{JsonLedgerStore, LedgerStore, MemoryLedgerStore};

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    init_with_config(&BillingConfig::default());
}

/// Like [`init`], honouring the configured log filter.
pub fn init_with_config(config: &BillingConfig) {
    let filter = config.log_filter.as_deref();
    if utils::init_tracing_with(filter) {
        tracing::info!("Dairy billing tracing initialized.");
    } else if let Some(filter) = filter {
        tracing::debug!(filter, "tracing already initialized; configured log filter ignored");
    }
}
