// calc_ledger/src/services/token_service.rs

//! HS256 access tokens and the in-memory revocation list used by logout.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::config::AppConfig;
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
  /// The user's email.
  pub sub: String,
  pub iat: i64,
  pub exp: i64,
  pub jti: String,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
  pub token: String,
  pub claims: AccessClaims,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
  #[error("access token is expired")]
  Expired,
  #[error("access token validation error: {0}")]
  Invalid(#[from] jsonwebtoken::errors::Error),
}

impl From<TokenError> for AppError {
  fn from(err: TokenError) -> Self {
    AppError::Auth(err.to_string())
  }
}

pub fn issue_token(email: &str, config: &AppConfig) -> Result<IssuedToken, AppError> {
  issue_token_at(email, config, Utc::now())
}

/// Issues a token as if the clock read `now`.
#[instrument(name = "token_service::issue_token", skip(config), err(Display))]
pub fn issue_token_at(email: &str, config: &AppConfig, now: DateTime<Utc>) -> Result<IssuedToken, AppError> {
  let claims = AccessClaims {
    sub: email.to_string(),
    iat: now.timestamp(),
    exp: (now + Duration::minutes(config.token_ttl_minutes)).timestamp(),
    jti: uuid::Uuid::new_v4().to_string(),
  };
  let token = jsonwebtoken::encode(
    &Header::new(Algorithm::HS256),
    &claims,
    &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
  )
  .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))?;
  debug!(jti = %claims.jti, exp = claims.exp, "Access token issued.");
  Ok(IssuedToken { token, claims })
}

pub fn validate_token(token: &str, config: &AppConfig) -> Result<AccessClaims, TokenError> {
  let mut validation = Validation::new(Algorithm::HS256);
  validation.leeway = 0;
  validation.set_required_spec_claims(&["exp", "sub"]);

  match jsonwebtoken::decode::<AccessClaims>(
    token,
    &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
    &validation,
  ) {
    Ok(data) => Ok(data.claims),
    Err(e) => {
      if e.kind() == &ErrorKind::ExpiredSignature {
        Err(TokenError::Expired)
      } else {
        Err(TokenError::Invalid(e))
      }
    }
  }
}

/// True when the token expires within the configured refresh window.
pub fn needs_refresh(claims: &AccessClaims, config: &AppConfig, now: DateTime<Utc>) -> bool {
  (now + Duration::minutes(config.token_refresh_window_minutes)).timestamp() > claims.exp
}

/// Token ids revoked by logout, kept until the token would have expired anyway.
#[derive(Debug, Default)]
pub struct RevokedTokens {
  entries: Mutex<HashMap<String, i64>>,
}

impl RevokedTokens {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn revoke(&self, claims: &AccessClaims) {
    let now = Utc::now().timestamp();
    let mut entries = self.entries.lock();
    entries.retain(|_, exp| *exp >= now);
    entries.insert(claims.jti.clone(), claims.exp);
  }

  pub fn is_revoked(&self, jti: &str) -> bool {
    self.entries.lock().contains_key(jti)
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> AppConfig {
    AppConfig {
      server_host: "127.0.0.1".into(),
      server_port: 0,
      database_url: "sqlite::memory:".into(),
      jwt_secret: "test-secret".into(),
      token_ttl_minutes: 10,
      token_refresh_window_minutes: 2,
      initial_balance: 100,
      random_org_url: "http://localhost/strings/".into(),
      random_org_timeout_secs: 1,
      seed_db: true,
    }
  }

  #[test]
  fn issued_tokens_validate() {
    let cfg = config();
    let issued = issue_token("a@b.io", &cfg).unwrap();
    let claims = validate_token(&issued.token, &cfg).unwrap();
    assert_eq!(claims, issued.claims);
    assert_eq!(claims.exp - claims.iat, 600);
  }

  #[test]
  fn expired_tokens_are_reported_as_expired() {
    let cfg = config();
    let issued = issue_token_at("a@b.io", &cfg, Utc::now() - Duration::minutes(11)).unwrap();
    assert!(matches!(validate_token(&issued.token, &cfg), Err(TokenError::Expired)));
  }

  #[test]
  fn tokens_signed_with_another_secret_are_invalid() {
    let cfg = config();
    let other = AppConfig {
      jwt_secret: "other".into(),
      ..config()
    };
    let issued = issue_token("a@b.io", &other).unwrap();
    assert!(matches!(validate_token(&issued.token, &cfg), Err(TokenError::Invalid(_))));
    assert!(matches!(validate_token("not.a.jwt", &cfg), Err(TokenError::Invalid(_))));
  }

  #[test]
  fn refresh_window() {
    let cfg = config();
    let now = Utc::now();
    let fresh = issue_token_at("a@b.io", &cfg, now).unwrap().claims;
    assert!(!needs_refresh(&fresh, &cfg, now));
    assert!(needs_refresh(&fresh, &cfg, now + Duration::minutes(9)));
  }

  #[test]
  fn revocation_prunes_expired_entries() {
    let revoked = RevokedTokens::new();
    let stale = AccessClaims {
      sub: "a@b.io".into(),
      iat: 0,
      exp: 1,
      jti: "stale".into(),
    };
    revoked.revoke(&stale);
    assert!(revoked.is_revoked("stale"));

    let live = issue_token("a@b.io", &config()).unwrap().claims;
    revoked.revoke(&live);
    assert!(!revoked.is_revoked("stale"));
    assert!(revoked.is_revoked(&live.jti));
    assert_eq!(revoked.len(), 1);
  }
}
