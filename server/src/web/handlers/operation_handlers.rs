// calc_ledger/src/web/handlers/operation_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

/// Public price list.
#[instrument(name = "handler::list_operations", skip(app_state))]
pub async fn list_operations_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let operations = app_state.repository.list_operations().await.map_err(|e| {
    error!("Failed to fetch operations: {}", e);
    e
  })?;
  info!(count = operations.len(), "Operations fetched.");
  Ok(HttpResponse::Ok().json(json!({ "data": operations })))
}
