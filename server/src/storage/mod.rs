// calc_ledger/src/storage/mod.rs

//! SQLite-backed ledger store.

mod query;
mod repository;

pub use query::{RecordQuery, SortColumn, SortDirection};
pub use repository::*;

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
