// calc_ledger/src/pipelines/signup.rs

use crate::errors::AppError;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::{password, token_service};
use billflow::{ContextData, FlowRegistry, FlowResult, Pipeline, PipelineControl};
use tracing::{event, info, instrument, warn, Level};

const INVALID_SIGNUP: &str = "not valid data provided";
const USER_EXISTS: &str = "user already exists";

/// Registers the sign-up pipeline: validate, reject duplicates, store the user, issue a token.
pub fn register_signup_pipeline(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user", false, None),
    ("create_user", false, None),
    ("issue_token", false, None),
  ]);

  signup_p.on_step("validate_signup_input", validate_signup_input)?;
  signup_p.on_step("check_existing_user", check_existing_user)?;
  signup_p.on_step("create_user", create_user)?;
  signup_p.on_step("issue_token", issue_token)?;

  flows.register_pipeline(signup_p);
  info!("Sign-up pipeline registered.");
  Ok(())
}

async fn validate_signup_input(ctx_data: ContextData<SignupCtxData>) -> Result<PipelineControl, AppError> {
  let (email_ok, password_ok) = {
    let guard = ctx_data.read();
    let email = guard.email.trim();
    (!email.is_empty() && email.contains('@'), !guard.password.is_empty())
  };

  if !email_ok || !password_ok {
    warn!(email_ok, password_ok, "Rejecting sign-up input.");
    return Err(AppError::Validation(INVALID_SIGNUP.to_string()));
  }

  // Stored and compared trimmed from here on.
  let mut guard = ctx_data.write();
  guard.email = guard.email.trim().to_string();
  Ok(PipelineControl::Continue)
}

#[instrument(name = "signup::check_existing_user", skip_all, err(Display))]
async fn check_existing_user(ctx_data: ContextData<SignupCtxData>) -> Result<PipelineControl, AppError> {
  let (email, repository) = {
    let guard = ctx_data.read();
    (guard.email.clone(), guard.app_state.repository.clone())
  };

  if repository.user_exists(&email).await? {
    warn!(%email, "Sign-up attempted with an existing email.");
    return Err(AppError::Validation(USER_EXISTS.to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "signup::create_user", skip_all, err(Display))]
async fn create_user(ctx_data: ContextData<SignupCtxData>) -> Result<PipelineControl, AppError> {
  let (email, plain_password, repository) = {
    let guard = ctx_data.read();
    (guard.email.clone(), guard.password.clone(), guard.app_state.repository.clone())
  };

  let password_hash = password::hash_password(&plain_password)?;

  let user = match repository.create_user(&email, &password_hash).await {
    Ok(user) => user,
    Err(AppError::Sqlx(e)) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
      // Lost a race with a concurrent sign-up for the same email.
      return Err(AppError::Validation(USER_EXISTS.to_string()));
    }
    Err(e) => return Err(e),
  };

  {
    let mut guard = ctx_data.write();
    guard.created_user_id = Some(user.id);
    guard.password.clear();
  }
  event!(Level::INFO, user_id = user.id, email = %user.email, "User created.");
  Ok(PipelineControl::Continue)
}

async fn issue_token(ctx_data: ContextData<SignupCtxData>) -> Result<PipelineControl, AppError> {
  let (email, config) = {
    let guard = ctx_data.read();
    (guard.email.clone(), guard.app_state.config.clone())
  };

  let issued = token_service::issue_token(&email, &config)?;
  ctx_data.write().issued_token = Some(issued);
  Ok(PipelineControl::Continue)
}
