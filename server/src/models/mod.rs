// calc_ledger/src/models/mod.rs

//! Rows of the ledger store.

pub mod operation;
pub mod record;
pub mod user;

pub use operation::Operation;
pub use record::{LedgerRecord, NewRecord};
pub use user::User;
