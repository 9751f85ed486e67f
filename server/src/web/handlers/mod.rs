// calc_ledger/src/web/handlers/mod.rs

pub mod auth_handlers;
pub mod calc_handlers;
pub mod operation_handlers;
pub mod record_handlers;
