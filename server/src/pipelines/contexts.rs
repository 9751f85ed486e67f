// calc_ledger/src/pipelines/contexts.rs

//! Data carried through each pipeline. Handlers see these wrapped in `billflow::ContextData`.

use crate::models::{LedgerRecord, Operation};
use crate::services::balance::BalanceSnapshot;
use crate::services::calculator::CalcOutput;
use crate::services::catalog::OperationKind;
use crate::services::token_service::IssuedToken;
use crate::state::AppState;
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub created_user_id: Option<i64>,
  pub issued_token: Option<IssuedToken>,
}

impl SignupCtxData {
  pub fn new(app_state: AppState, email: String, password: String) -> Self {
    Self {
      app_state,
      email,
      password,
      created_user_id: None,
      issued_token: None,
    }
  }
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub temp_password_hash: Option<String>,
  pub user_id: Option<i64>,
  pub issued_token: Option<IssuedToken>,
}

impl SigninCtxData {
  pub fn new(app_state: AppState, email: String, password: String) -> Self {
    Self {
      app_state,
      email,
      password,
      temp_password_hash: None,
      user_id: None,
      issued_token: None,
    }
  }
}

/// One billed calculation, from balance lookup to the appended record.
#[derive(Clone)]
pub struct BillingCtxData {
  pub app_state: AppState,
  /// Authenticated identity; the charge always lands on this user.
  pub email: String,
  pub alias: String,
  /// `nums` exactly as received.
  pub raw_operands: Option<Value>,
  /// Extra options (`ops`), stored as the input of random string records.
  pub options: Map<String, Value>,

  pub snapshot: Option<BalanceSnapshot>,
  pub operation: Option<Operation>,
  pub kind: Option<OperationKind>,
  pub operands: Vec<f64>,
  /// Balance after the charge; only in memory until the record is written.
  pub tentative_balance: Option<i64>,
  pub output: Option<CalcOutput>,
  pub record: Option<LedgerRecord>,
}

impl BillingCtxData {
  pub fn new(
    app_state: AppState,
    email: String,
    alias: String,
    raw_operands: Option<Value>,
    options: Map<String, Value>,
  ) -> Self {
    Self {
      app_state,
      email,
      alias,
      raw_operands,
      options,
      snapshot: None,
      operation: None,
      kind: None,
      operands: Vec::new(),
      tentative_balance: None,
      output: None,
      record: None,
    }
  }
}
