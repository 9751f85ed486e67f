// calc_ledger/src/services/mod.rs

pub mod balance;
pub mod calculator;
pub mod catalog;
pub mod password;
pub mod random_org;
pub mod record_listing;
pub mod token_service;
