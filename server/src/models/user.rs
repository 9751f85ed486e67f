// calc_ledger/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: i64,
  pub email: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub status: bool,
  pub created_at: DateTime<Utc>,
  pub deleted_at: Option<DateTime<Utc>>,
}
