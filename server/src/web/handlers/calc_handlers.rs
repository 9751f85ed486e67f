// calc_ledger/src/web/handlers/calc_handlers.rs

use actix_web::{web, HttpResponse};
use billflow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::BillingCtxData;
use crate::state::AppState;
use crate::web::auth::{json_with_refresh, AuthenticatedUser};

#[derive(Deserialize, Debug)]
pub struct CalcRequestPayload {
  /// JSON array of numbers or a comma separated string.
  #[serde(default)]
  pub nums: Option<Value>,
  #[serde(default)]
  pub ops: Option<Map<String, Value>>,
  #[serde(default)]
  pub operation: Option<String>,
}

#[instrument(
  name = "handler::calc",
  skip(app_state, req_payload, auth_user),
  fields(email = %auth_user.email, operation = ?req_payload.operation)
)]
pub async fn calc_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CalcRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let CalcRequestPayload { nums, ops, operation } = req_payload.into_inner();
  let alias = operation.ok_or_else(|| AppError::Validation("not valid operation".to_string()))?;

  let ctx_data = ContextData::new(BillingCtxData::new(
    app_state.get_ref().clone(),
    auth_user.email.clone(),
    alias,
    nums,
    ops.unwrap_or_default(),
  ));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let body = {
        let guard = ctx_data.read();
        let (Some(output), Some(record)) = (guard.output.as_ref(), guard.record.as_ref()) else {
          warn!("Billing pipeline completed without output or record.");
          return Err(AppError::Internal("billing completed without a record".to_string()));
        };
        info!(record_id = record.id, balance = record.user_balance, "Calculation billed.");
        json!({
          "output": output,
          "user_credit": record.user_balance,
          "response": record,
        })
      };
      json_with_refresh(&app_state, &auth_user, body)
    }
    PipelineResult::Stopped => Err(AppError::Internal("Billing was halted by an internal step.".to_string())),
  }
}
