// calc_ledger/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use billflow::FlowError;
use serde_json::json;
use thiserror::Error;

/// Message returned when a ledger write fails.
pub const PERSISTENCE_REJECTED: &str = "operation rejected by database";

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Insufficient Credit: {0}")]
  InsufficientCredit(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// The balance moved between resolution and the ledger write.
  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Upstream Provider Error: {0}")]
  Upstream(String),

  #[error("Persistence Error: {0}")]
  Persistence(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Text placed in the `messages` field of the response body.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::InsufficientCredit(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m)
      | AppError::Upstream(m) => m.clone(),
      AppError::Persistence(_) => PERSISTENCE_REJECTED.to_string(),
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        "an internal error occurred".to_string()
      }
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::InsufficientCredit(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
      AppError::Persistence(_)
      | AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
    }
    HttpResponse::build(status).json(json!({ "messages": self.public_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;

  #[actix_web::test]
  async fn maps_variants_to_status_codes() {
    let cases = [
      (AppError::Validation("x".into()), 400),
      (AppError::Auth("x".into()), 401),
      (AppError::InsufficientCredit("x".into()), 402),
      (AppError::NotFound("x".into()), 404),
      (AppError::Conflict("x".into()), 409),
      (AppError::Upstream("x".into()), 502),
      (AppError::Persistence("x".into()), 500),
      (AppError::Internal("x".into()), 500),
    ];
    for (err, status) in cases {
      assert_eq!(err.status_code().as_u16(), status, "{err}");
    }
  }

  #[actix_web::test]
  async fn hides_internal_details() {
    let resp = AppError::Internal("db password is hunter2".into()).error_response();
    let body = to_bytes(resp.into_body()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, json!({"messages": "an internal error occurred"}));
  }

  #[actix_web::test]
  async fn persistence_failures_use_fixed_message() {
    let resp = AppError::Persistence("UNIQUE constraint failed".into()).error_response();
    let body = to_bytes(resp.into_body()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["messages"], PERSISTENCE_REJECTED);
  }
}
