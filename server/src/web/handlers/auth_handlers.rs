// calc_ledger/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use billflow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::balance::resolve_balance;
use crate::state::AppState;
use crate::web::auth::{json_with_refresh, AuthenticatedUser};

/// Missing fields are reported by the pipelines, not by JSON extraction.
#[derive(Deserialize, Debug, Default)]
pub struct CredentialsPayload {
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub password: Option<String>,
}

#[instrument(name = "handler::create_user", skip(app_state, req_payload), fields(req_email = ?req_payload.email))]
pub async fn create_user_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CredentialsPayload>,
) -> Result<HttpResponse, AppError> {
  let CredentialsPayload { email, password } = req_payload.into_inner();
  let (Some(email), Some(password)) = (email, password) else {
    return Err(AppError::Validation("not valid data provided".to_string()));
  };

  let ctx_data = ContextData::new(SignupCtxData::new(app_state.get_ref().clone(), email, password));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx_data.read();
      let issued = guard.issued_token.as_ref().ok_or_else(|| {
        warn!("Sign-up pipeline completed without issuing a token.");
        AppError::Internal("Sign-up completed without a token.".to_string())
      })?;
      info!(user_id = ?guard.created_user_id, "Sign-up successful.");
      Ok(HttpResponse::Ok().json(json!({
        "email": guard.email,
        "access_token": issued.token,
      })))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Sign-up process was halted by an internal step.".to_string())),
  }
}

#[instrument(name = "handler::token", skip(app_state, req_payload), fields(req_email = ?req_payload.email))]
pub async fn token_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CredentialsPayload>,
) -> Result<HttpResponse, AppError> {
  let CredentialsPayload { email, password } = req_payload.into_inner();
  let ctx_data = ContextData::new(SigninCtxData::new(
    app_state.get_ref().clone(),
    email.unwrap_or_default(),
    password.unwrap_or_default(),
  ));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx_data.read();
      let issued = guard
        .issued_token
        .as_ref()
        .ok_or_else(|| AppError::Auth("Sign-in completed without a token.".to_string()))?;
      info!(user_id = ?guard.user_id, "Sign-in successful.");
      Ok(HttpResponse::Ok().json(json!({ "access_token": issued.token })))
    }
    PipelineResult::Stopped => Err(AppError::Auth("Authentication process was unexpectedly halted.".to_string())),
  }
}

/// Revokes the presented token, if any. Always succeeds.
#[instrument(name = "handler::logout", skip_all)]
pub async fn logout_handler(app_state: web::Data<AppState>, auth_user: Option<AuthenticatedUser>) -> HttpResponse {
  if let Some(user) = auth_user {
    app_state.revoked_tokens.revoke(&user.claims);
    info!(email = %user.email, jti = %user.claims.jti, "Token revoked.");
  }
  HttpResponse::Ok().json(json!({ "messages": "logout successful" }))
}

#[instrument(name = "handler::profile", skip(app_state, auth_user), fields(email = %auth_user.email))]
pub async fn profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let snapshot = resolve_balance(&app_state.repository, &auth_user.email, app_state.config.initial_balance)
    .await?
    .ok_or_else(|| AppError::Auth("user not found".to_string()))?;

  json_with_refresh(
    &app_state,
    &auth_user,
    json!({ "user": auth_user.email, "user_credit": snapshot.balance }),
  )
}

/// Authenticated no-op. Clients call it to get a refreshed token.
pub async fn ping_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  json_with_refresh(&app_state, &auth_user, json!({}))
}

pub async fn index_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  json_with_refresh(&app_state, &auth_user, json!({}))
}
