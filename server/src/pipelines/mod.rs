// calc_ledger/src/pipelines/mod.rs

//! The request flows expressed as billflow pipelines.

use crate::errors::AppError;
use billflow::{FlowRegistry, FlowResult};

pub mod billing;
pub mod contexts;
pub mod signin;
pub mod signup;

/// Registers every pipeline. Called once while building `AppState`.
pub fn register_all_pipelines(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  signup::register_signup_pipeline(flows)?;
  signin::register_signin_pipeline(flows)?;
  billing::register_billing_pipeline(flows)?;
  tracing::info!("All application pipelines registered.");
  Ok(())
}
