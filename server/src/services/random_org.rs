// calc_ledger/src/services/random_org.rs

//! Random strings from random.org's plain-text strings API.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum RandomSourceError {
  #[error("random string request failed: {0}")]
  Request(#[from] reqwest::Error),
  #[error("random string provider answered with status {0}")]
  Status(u16),
  #[error("random string provider returned an empty body")]
  Empty,
}

/// Something that hands out one random string per call.
#[async_trait]
pub trait RandomStringSource: Send + Sync {
  async fn random_string(&self) -> Result<String, RandomSourceError>;
}

/// Client for `GET {base_url}?num=1&len=20&...&format=plain`.
#[derive(Debug, Clone)]
pub struct RandomOrgClient {
  http: reqwest::Client,
  base_url: String,
}

impl RandomOrgClient {
  /// Every request is bounded by `timeout`.
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build random.org HTTP client: {}", e)))?;
    Ok(Self {
      http,
      base_url: base_url.into(),
    })
  }
}

#[async_trait]
impl RandomStringSource for RandomOrgClient {
  #[instrument(name = "random_org::random_string", skip(self), fields(url = %self.base_url), err(Display))]
  async fn random_string(&self) -> Result<String, RandomSourceError> {
    let response = self
      .http
      .get(&self.base_url)
      .query(&[
        ("num", "1"),
        ("len", "20"),
        ("digits", "on"),
        ("upperalpha", "on"),
        ("loweralpha", "on"),
        ("unique", "on"),
        ("format", "plain"),
        ("rnd", "new"),
      ])
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      warn!(status = status.as_u16(), "random.org rejected the request.");
      return Err(RandomSourceError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    let value = body.trim_end().to_string(); // plain format ends with a newline
    if value.is_empty() {
      return Err(RandomSourceError::Empty);
    }
    debug!(len = value.len(), "Random string received.");
    Ok(value)
  }
}
