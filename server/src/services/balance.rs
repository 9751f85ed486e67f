// calc_ledger/src/services/balance.rs

use serde::Serialize;
use tracing::{debug, instrument};

use crate::errors::Result;
use crate::storage::Repository;

/// A user's balance and the ledger position it was read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
  pub user_id: i64,
  pub balance: i64,
  /// Id of the record the balance came from; `None` when the default applied.
  pub last_record_id: Option<i64>,
}

/// Balance of the active user `email`: the latest live record's balance, or
/// `default_balance` for a user without records. `None` if no such user exists.
#[instrument(name = "balance::resolve", skip(repository), err(Display))]
pub async fn resolve_balance(
  repository: &Repository,
  email: &str,
  default_balance: i64,
) -> Result<Option<BalanceSnapshot>> {
  let Some(user) = repository.find_active_user_by_email(email).await? else {
    debug!("Unknown user, no balance.");
    return Ok(None);
  };

  let snapshot = match repository.latest_record_for_user(user.id).await? {
    Some(latest) => BalanceSnapshot {
      user_id: user.id,
      balance: latest.balance,
      last_record_id: Some(latest.record_id),
    },
    None => BalanceSnapshot {
      user_id: user.id,
      balance: default_balance,
      last_record_id: None,
    },
  };
  debug!(user_id = snapshot.user_id, balance = snapshot.balance, "Balance resolved.");
  Ok(Some(snapshot))
}
