// calc_ledger/src/models/record.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

/// One billed operation, joined with its catalog entry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LedgerRecord {
  pub id: i64,
  pub operation_type: String,
  pub alias: String,
  pub operation_response: Json<Value>,
  pub date: DateTime<Utc>,
  /// Balance of the user right after this charge.
  pub user_balance: i64,
  pub amount: i64,
}

/// Values for a record that has not been written yet.
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub operation_id: i64,
  pub user_id: i64,
  pub amount: i64,
  pub user_balance: i64,
  pub operation_response: Value,
  pub created_at: DateTime<Utc>,
}
