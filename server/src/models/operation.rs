// calc_ledger/src/models/operation.rs

use serde::Serialize;
use sqlx::FromRow;

/// A billable catalog entry. Serialized as `{id, type, alias, cost}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Operation {
  pub id: i64,
  #[serde(rename = "type")]
  pub operation_type: String,
  pub alias: String,
  pub cost: i64,
}
