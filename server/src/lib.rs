// calc_ledger/src/lib.rs

//! calc_ledger: an authenticated credit ledger behind a small calculator service.
//!
//! Every billed calculation appends a record carrying the user's balance after
//! the charge. The current balance is read back from the latest record.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod storage;
pub mod web;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
