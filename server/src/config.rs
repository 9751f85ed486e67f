// calc_ledger/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  pub jwt_secret: String,
  pub token_ttl_minutes: i64,
  /// Tokens expiring within this window are reissued on authenticated responses.
  pub token_refresh_window_minutes: i64,

  /// Balance of a user that has no ledger records yet.
  pub initial_balance: i64,

  pub random_org_url: String,
  pub random_org_timeout_secs: u64,

  /// Insert the operation catalog at startup (idempotent).
  pub seed_db: bool,
}

fn parse_or<T>(var_name: &str, default: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  env::var(var_name)
    .unwrap_or_else(|_| default.to_string())
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // .env is optional

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = parse_or::<u16>("SERVER_PORT", "8080")?;
    let database_url = get_env("DATABASE_URL").unwrap_or_else(|_| "sqlite://calc_ledger.db".to_string());

    let jwt_secret = get_env("JWT_SECRET_KEY")?;
    if jwt_secret.trim().is_empty() {
      return Err(AppError::Config("JWT_SECRET_KEY must not be empty".to_string()));
    }
    let token_ttl_minutes = parse_or::<i64>("TOKEN_TTL_MINUTES", "10")?;
    let token_refresh_window_minutes = parse_or::<i64>("TOKEN_REFRESH_WINDOW_MINUTES", "2")?;
    if token_ttl_minutes <= 0 || token_refresh_window_minutes < 0 {
      return Err(AppError::Config(
        "TOKEN_TTL_MINUTES must be positive and TOKEN_REFRESH_WINDOW_MINUTES non-negative".to_string(),
      ));
    }

    let initial_balance = parse_or::<i64>("INITIAL_BALANCE", "100")?;

    let random_org_url = get_env("RANDOM_ORG_URL").unwrap_or_else(|_| "https://www.random.org/strings/".to_string());
    let random_org_timeout_secs = parse_or::<u64>("RANDOM_ORG_TIMEOUT_SECS", "10")?;

    let seed_db = parse_or::<bool>("SEED_DB", "true")?;

    tracing::info!(
      %server_host,
      server_port,
      initial_balance,
      token_ttl_minutes,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      jwt_secret,
      token_ttl_minutes,
      token_refresh_window_minutes,
      initial_balance,
      random_org_url,
      random_org_timeout_secs,
      seed_db,
    })
  }
}
