// calc_ledger/src/services/password.rs

//! Argon2 password hashing.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use tracing::{debug, error, instrument};

/// Hashes `password` with a fresh random salt. Returns the PHC string.
#[instrument(name = "password::hash", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("not valid data provided".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing failed: {}", e))
    })
}

/// `Ok(false)` on mismatch. A stored hash that does not parse is an internal error.
#[instrument(name = "password::verify", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool, AppError> {
  let parsed = PasswordHash::new(stored_hash).map_err(|e| {
    error!(error = %e, "Stored password hash is malformed.");
    AppError::Internal(format!("Invalid stored password hash: {}", e))
  })?;

  match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password mismatch.");
      Ok(false)
    }
    Err(e) => Err(AppError::Internal(format!("Password verification failed: {}", e))),
  }
}
