// calc_ledger/src/pipelines/billing.rs

//! Billing: resolve the balance, validate the operation, reserve the cost,
//! compute, and append the ledger record.
//!
//! Nothing is written before `persist_record`. A failure in a later step runs
//! the `check_funds` rollback, which discards the tentative debit.

use crate::errors::AppError;
use crate::models::NewRecord;
use crate::pipelines::contexts::BillingCtxData;
use crate::services::balance::resolve_balance;
use crate::services::calculator::{self, CalcError};
use crate::services::catalog::OperationKind;
use billflow::{ContextData, FlowRegistry, FlowResult, Pipeline, PipelineControl};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, event, info, instrument, warn, Level};

pub const NOT_ENOUGH_CREDIT: &str = "not enough credit for requested operation";

pub fn register_billing_pipeline(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  let mut billing_p = Pipeline::<BillingCtxData, AppError>::new(&[
    ("resolve_balance", false, None),
    ("validate_operation", false, None),
    ("check_funds", false, None),
    ("execute_calculation", false, None),
    ("persist_record", false, None),
  ]);

  billing_p.on_step("resolve_balance", resolve_caller_balance)?;
  billing_p.on_step("validate_operation", validate_operation)?;
  billing_p.on_step("check_funds", check_funds)?;
  billing_p.on_rollback("check_funds", |ctx_data: ContextData<BillingCtxData>| {
    Box::pin(async move {
      let released = ctx_data.write().tentative_balance.take();
      event!(Level::INFO, ?released, "Tentative debit discarded.");
      Ok::<(), AppError>(())
    })
  })?;
  billing_p.on_step("execute_calculation", execute_calculation)?;
  billing_p.on_step("persist_record", persist_record)?;

  flows.register_pipeline(billing_p);
  info!("Billing pipeline registered.");
  Ok(())
}

#[instrument(name = "billing::resolve_balance", skip_all, err(Display))]
async fn resolve_caller_balance(ctx_data: ContextData<BillingCtxData>) -> Result<PipelineControl, AppError> {
  let (email, repository, default_balance) = {
    let guard = ctx_data.read();
    (
      guard.email.clone(),
      guard.app_state.repository.clone(),
      guard.app_state.config.initial_balance,
    )
  };

  let snapshot = resolve_balance(&repository, &email, default_balance)
    .await?
    .ok_or_else(|| AppError::Auth("user not detected".to_string()))?;

  ctx_data.write().snapshot = Some(snapshot);
  Ok(PipelineControl::Continue)
}

/// Looks the alias up in the catalog and reads the operands it needs.
#[instrument(name = "billing::validate_operation", skip_all, err(Display))]
async fn validate_operation(ctx_data: ContextData<BillingCtxData>) -> Result<PipelineControl, AppError> {
  let (alias, raw_operands, repository) = {
    let guard = ctx_data.read();
    (
      guard.alias.clone(),
      guard.raw_operands.clone(),
      guard.app_state.repository.clone(),
    )
  };

  let Some(operation) = repository.operation_by_alias(&alias).await? else {
    warn!(%alias, "Unknown operation requested.");
    return Err(CalcError::InvalidOperation.into());
  };
  let kind = OperationKind::from_alias(&operation.alias).ok_or_else(|| {
    warn!(alias = %operation.alias, "Catalog entry has no calculation behind it.");
    AppError::from(CalcError::InvalidOperation)
  })?;

  let operands = if kind.takes_operands() {
    calculator::parse_operands(raw_operands.as_ref().unwrap_or(&Value::Null))?
  } else {
    Vec::new()
  };

  let mut guard = ctx_data.write();
  guard.operation = Some(operation);
  guard.kind = Some(kind);
  guard.operands = operands;
  Ok(PipelineControl::Continue)
}

async fn check_funds(ctx_data: ContextData<BillingCtxData>) -> Result<PipelineControl, AppError> {
  let mut guard = ctx_data.write();
  let (Some(snapshot), Some(cost)) = (guard.snapshot, guard.operation.as_ref().map(|op| op.cost)) else {
    return Err(AppError::Internal("billing context incomplete before check_funds".to_string()));
  };

  if snapshot.balance <= 0 || snapshot.balance < cost {
    warn!(balance = snapshot.balance, cost, "Insufficient credit.");
    return Err(AppError::InsufficientCredit(NOT_ENOUGH_CREDIT.to_string()));
  }

  let tentative = snapshot.balance - cost;
  guard.tentative_balance = Some(tentative);
  debug!(balance = snapshot.balance, cost, tentative, "Funds reserved in memory.");
  Ok(PipelineControl::Continue)
}

#[instrument(name = "billing::execute_calculation", skip_all, err(Display))]
async fn execute_calculation(ctx_data: ContextData<BillingCtxData>) -> Result<PipelineControl, AppError> {
  let (kind, operands, random_source) = {
    let guard = ctx_data.read();
    (guard.kind, guard.operands.clone(), guard.app_state.random_source.clone())
  };
  let kind = kind.ok_or_else(|| AppError::Internal("operation kind missing before calculation".to_string()))?;

  let output = calculator::compute(kind, &operands, random_source.as_ref()).await?;
  ctx_data.write().output = Some(output);
  Ok(PipelineControl::Continue)
}

/// Appends the record, guarded against a concurrent charge for the same user.
#[instrument(name = "billing::persist_record", skip_all, err(Display))]
async fn persist_record(ctx_data: ContextData<BillingCtxData>) -> Result<PipelineControl, AppError> {
  let (new_record, expected_latest, repository) = {
    let guard = ctx_data.read();
    let incomplete = || AppError::Internal("billing context incomplete before persist_record".to_string());
    let snapshot = guard.snapshot.ok_or_else(incomplete)?;
    let operation = guard.operation.as_ref().ok_or_else(incomplete)?;
    let kind = guard.kind.ok_or_else(incomplete)?;
    let output = guard.output.as_ref().ok_or_else(incomplete)?;
    let user_balance = guard.tentative_balance.ok_or_else(incomplete)?;

    let input = if kind.takes_operands() {
      json!(guard.operands)
    } else {
      let mut options = guard.options.clone();
      options.insert("randomstrings".to_string(), json!(1));
      Value::Object(options)
    };

    let new_record = NewRecord {
      operation_id: operation.id,
      user_id: snapshot.user_id,
      amount: operation.cost,
      user_balance,
      operation_response: json!({ "response": output, "input": input }),
      created_at: Utc::now(),
    };
    (new_record, snapshot.last_record_id, guard.app_state.repository.clone())
  };

  let record = repository
    .insert_record_guarded(&new_record, expected_latest)
    .await?
    .ok_or_else(|| AppError::Conflict("balance changed by a concurrent operation, please retry".to_string()))?;

  event!(
    Level::INFO,
    record_id = record.id,
    user_id = new_record.user_id,
    balance = record.user_balance,
    "Charge recorded."
  );
  ctx_data.write().record = Some(record);
  Ok(PipelineControl::Continue)
}
