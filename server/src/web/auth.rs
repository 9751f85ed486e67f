// calc_ledger/src/web/auth.rs

//! Bearer-token authentication and the near-expiry token refresh.

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use chrono::Utc;
use futures_util::future::{ready, Ready};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::services::token_service::{self, AccessClaims};
use crate::state::AppState;

/// The caller, as proven by a valid, unrevoked access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub email: String,
  pub claims: AccessClaims,
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
  let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
  let token = header.strip_prefix("Bearer ").or_else(|| header.strip_prefix("bearer "))?;
  let token = token.trim();
  (!token.is_empty()).then_some(token)
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let app_state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("AppState missing from application data".to_string()))?;

  let token = bearer_token(req).ok_or_else(|| {
    warn!("Missing or malformed Authorization header.");
    AppError::Auth("Missing Authorization Header".to_string())
  })?;

  let claims = token_service::validate_token(token, &app_state.config)?;
  if app_state.revoked_tokens.is_revoked(&claims.jti) {
    warn!(jti = %claims.jti, "Revoked token presented.");
    return Err(AppError::Auth("token has been revoked".to_string()));
  }

  Ok(AuthenticatedUser {
    email: claims.sub.clone(),
    claims,
  })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(authenticate(req))
  }
}

/// 200 JSON response for an authenticated caller. When the caller's token is
/// about to expire, `access_token` and `expiration` of a fresh token are added.
pub fn json_with_refresh(app_state: &AppState, user: &AuthenticatedUser, mut body: Value) -> Result<HttpResponse, AppError> {
  if token_service::needs_refresh(&user.claims, &app_state.config, Utc::now()) {
    if let Value::Object(map) = &mut body {
      let issued = token_service::issue_token(&user.email, &app_state.config)?;
      debug!(old_exp = user.claims.exp, new_exp = issued.claims.exp, "Refreshing access token.");
      map.insert("access_token".to_string(), Value::String(issued.token));
      map.insert("expiration".to_string(), Value::from(issued.claims.exp));
    }
  }
  Ok(HttpResponse::Ok().json(body))
}
