// calc_ledger/src/web/handlers/record_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::record_listing::{ListRecordsRequest, Paginator, PER_PAGE};
use crate::state::AppState;
use crate::web::auth::{json_with_refresh, AuthenticatedUser};

async fn current_user_id(app_state: &AppState, auth_user: &AuthenticatedUser) -> Result<i64, AppError> {
  app_state
    .repository
    .find_active_user_by_email(&auth_user.email)
    .await?
    .map(|user| user.id)
    .ok_or_else(|| AppError::Auth("user not detected".to_string()))
}

#[instrument(name = "handler::list_records", skip(app_state, req_payload, auth_user), fields(email = %auth_user.email))]
pub async fn list_records_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ListRecordsRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user_id = current_user_id(&app_state, &auth_user).await?;
  let page_number = req_payload.page();
  let query = req_payload.to_query()?;

  let total_items = app_state.repository.count_records(user_id, &query).await?;
  let records = app_state.repository.list_records(user_id, &query).await?;
  let paginator = Paginator::new(page_number, total_items, PER_PAGE);
  info!(page_number, total_items, returned = records.len(), "Records listed.");

  json_with_refresh(&app_state, &auth_user, json!({ "paginator": paginator, "records": records }))
}
