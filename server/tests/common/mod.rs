// tests/common/mod.rs
#![allow(dead_code, unused_macros)] // Each test binary uses a different subset.

use async_trait::async_trait;
use calc_ledger::services::catalog::DEFAULT_CATALOG;
use calc_ledger::services::random_org::{RandomSourceError, RandomStringSource};
use calc_ledger::storage::Repository;
use calc_ledger::{AppConfig, AppState};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::Level;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: "sqlite::memory:".to_string(),
    jwt_secret: "integration-secret".to_string(),
    token_ttl_minutes: 10,
    token_refresh_window_minutes: 2,
    initial_balance: 100,
    random_org_url: "http://127.0.0.1:9/strings/".to_string(),
    random_org_timeout_secs: 1,
    seed_db: true,
  }
}

/// Random source that replays canned answers; `None` simulates a provider failure.
pub struct StubRandomSource {
  answers: Mutex<Vec<Option<String>>>,
  pub calls: Mutex<usize>,
}

impl StubRandomSource {
  pub fn always(value: &str) -> Self {
    Self {
      answers: Mutex::new(vec![Some(value.to_string())]),
      calls: Mutex::new(0),
    }
  }

  pub fn failing() -> Self {
    Self {
      answers: Mutex::new(vec![None]),
      calls: Mutex::new(0),
    }
  }
}

#[async_trait]
impl RandomStringSource for StubRandomSource {
  async fn random_string(&self) -> Result<String, RandomSourceError> {
    *self.calls.lock() += 1;
    let answer = self.answers.lock().first().cloned().flatten();
    answer.ok_or(RandomSourceError::Status(503))
  }
}

pub async fn test_state_with(config: AppConfig, random_source: Arc<dyn RandomStringSource>) -> AppState {
  setup_tracing();
  let repository = Repository::init(&config.database_url).await.expect("in-memory database");
  repository.seed_operations(DEFAULT_CATALOG).await.expect("seed catalog");
  AppState::new(repository, config, random_source).expect("app state")
}

pub async fn test_state() -> AppState {
  test_state_with(test_config(), Arc::new(StubRandomSource::always("Xy7Qp0LmN3rT8vWz1KbC"))).await
}

/// `init_service` over the full route table.
macro_rules! test_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .configure(calc_ledger::web::configure_app_routes),
    )
    .await
  };
}

/// Signs `$email` up and returns the access token.
macro_rules! signup {
  ($app:expr, $email:expr) => {{
    let req = actix_web::test::TestRequest::post()
      .uri("/create_user")
      .set_json(serde_json::json!({ "email": $email, "password": "correct horse" }))
      .to_request();
    let body: serde_json::Value = actix_web::test::call_and_read_body_json(&$app, req).await;
    body["access_token"].as_str().expect("access_token").to_string()
  }};
}

/// Sends a request and returns `(status, json body)`.
macro_rules! call_json {
  ($app:expr, $req:expr) => {{
    let resp = actix_web::test::call_service(&$app, $req).await;
    let status = resp.status().as_u16();
    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    (status, body)
  }};
}

/// POST /api/v1/service/calc as `$token`.
macro_rules! calc {
  ($app:expr, $token:expr, $body:expr) => {{
    let req = actix_web::test::TestRequest::post()
      .uri("/api/v1/service/calc")
      .insert_header(("Authorization", format!("Bearer {}", $token)))
      .set_json($body)
      .to_request();
    call_json!($app, req)
  }};
}
