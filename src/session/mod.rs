//! Stateful coordination of bill generation and ledger mutations.

pub mod bill_session;
pub mod mutation;

pub use bill_session::{BillSession, SessionState};
pub use mutation::{GenerateOutcome, MutationOp};
