// calc_ledger/src/pipelines/signin.rs

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::{password, token_service};
use billflow::{ContextData, FlowRegistry, FlowResult, Pipeline, PipelineControl};
use tracing::{error, event, info, instrument, warn, Level};

/// Every sign-in failure looks the same to the caller.
const BAD_CREDENTIALS: &str = "access field were missings or incorrect";

fn bad_credentials() -> AppError {
  AppError::Auth(BAD_CREDENTIALS.to_string())
}

/// Registers the sign-in pipeline: validate, look the user up, check the password, issue a token.
pub fn register_signin_pipeline(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_by_email", false, None),
    ("verify_user_password", false, None),
    ("issue_token", false, None),
  ]);

  signin_p.on_step("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if guard.email.trim().is_empty() || guard.password.is_empty() {
        warn!("Sign-in attempted with missing credentials.");
        return Err(bad_credentials());
      }
      Ok(PipelineControl::Continue)
    })
  })?;
  signin_p.on_step("fetch_user_by_email", fetch_user_by_email)?;
  signin_p.on_step("verify_user_password", verify_user_password)?;
  signin_p.on_step("issue_token", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, config) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.config.clone())
      };
      let issued = token_service::issue_token(&email, &config)?;
      ctx_data.write().issued_token = Some(issued);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  flows.register_pipeline(signin_p);
  info!("Sign-in pipeline registered.");
  Ok(())
}

#[instrument(name = "signin::fetch_user_by_email", skip_all, err(Display))]
async fn fetch_user_by_email(ctx_data: ContextData<SigninCtxData>) -> Result<PipelineControl, AppError> {
  let (email, repository) = {
    let guard = ctx_data.read();
    (guard.email.trim().to_string(), guard.app_state.repository.clone())
  };

  let Some(user) = repository.find_active_user_by_email(&email).await? else {
    warn!(%email, "Sign-in for unknown user.");
    return Err(bad_credentials());
  };

  {
    let mut guard = ctx_data.write();
    guard.email = user.email.clone();
    guard.user_id = Some(user.id);
    guard.temp_password_hash = Some(user.password_hash);
  }
  event!(Level::DEBUG, user_id = user.id, "User found for sign-in.");
  Ok(PipelineControl::Continue)
}

async fn verify_user_password(ctx_data: ContextData<SigninCtxData>) -> Result<PipelineControl, AppError> {
  let (stored_hash, candidate, user_id) = {
    let mut guard = ctx_data.write();
    (guard.temp_password_hash.take(), guard.password.clone(), guard.user_id)
  };

  let stored_hash = stored_hash.ok_or_else(|| AppError::Internal("password hash missing from sign-in context".to_string()))?;

  let matches = password::verify_password(&stored_hash, &candidate).unwrap_or_else(|e| {
    error!(?user_id, error = %e, "Stored password hash could not be checked.");
    false
  });
  if !matches {
    warn!(?user_id, "Password mismatch on sign-in.");
    return Err(bad_credentials());
  }
  event!(Level::INFO, ?user_id, "Password verified.");
  Ok(PipelineControl::Continue)
}
