// billflow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Step already defined: {step_name}")]
  DuplicateStep { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context type {type_name}")]
  NoPipelineRegistered { type_name: String },

  #[error("Type mismatch during context downcast (expected {expected_type})")]
  TypeMismatch { expected_type: String },

  #[error("Error in handler. Source: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal billflow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::Handler { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
