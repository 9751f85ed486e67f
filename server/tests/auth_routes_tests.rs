// tests/auth_routes_tests.rs
#[macro_use]
mod common;

use actix_web::test::{self, TestRequest};
use calc_ledger::services::token_service::{issue_token_at, validate_token};
use chrono::{Duration, Utc};
use common::*;
use serde_json::json;
use std::sync::Arc;

fn bearer(token: &str) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", token))
}

#[actix_web::test]
async fn test_create_user_returns_token() {
  let state = test_state().await;
  let app = test_app!(state);

  let req = TestRequest::post()
    .uri("/create_user")
    .set_json(json!({"email": "ada@example.com", "password": "correct horse"}))
    .to_request();
  let (status, body) = call_json!(app, req);

  assert_eq!(status, 200);
  assert_eq!(body["email"], "ada@example.com");
  let token = body["access_token"].as_str().unwrap();
  let claims = validate_token(token, &state.config).unwrap();
  assert_eq!(claims.sub, "ada@example.com");
}

#[actix_web::test]
async fn test_create_user_rejects_duplicates_and_missing_fields() {
  let state = test_state().await;
  let app = test_app!(state);
  signup!(app, "dup@example.com");

  let req = TestRequest::post()
    .uri("/create_user")
    .set_json(json!({"email": "dup@example.com", "password": "another one"}))
    .to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 400);
  assert_eq!(body["messages"], "user already exists");

  let req = TestRequest::post()
    .uri("/create_user")
    .set_json(json!({"email": "nopass@example.com"}))
    .to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 400);
  assert_eq!(body["messages"], "not valid data provided");
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
  let state = test_state().await;
  let app = test_app!(state);

  let req = TestRequest::post()
    .uri("/create_user")
    .insert_header(("content-type", "application/json"))
    .set_payload("{\"email\": ")
    .to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 400);
  assert!(body["messages"].as_str().unwrap().starts_with("invalid JSON body"));
}

#[actix_web::test]
async fn test_token_checks_credentials() {
  let state = test_state().await;
  let app = test_app!(state);
  signup!(app, "bob@example.com");

  let req = TestRequest::post()
    .uri("/token")
    .set_json(json!({"email": "bob@example.com", "password": "correct horse"}))
    .to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 200);
  assert!(body["access_token"].is_string());

  for payload in [
    json!({"email": "bob@example.com", "password": "wrong"}),
    json!({"email": "nobody@example.com", "password": "correct horse"}),
    json!({"email": "bob@example.com"}),
    json!({}),
  ] {
    let req = TestRequest::post().uri("/token").set_json(payload.clone()).to_request();
    let (status, body) = call_json!(app, req);
    assert_eq!(status, 401, "payload {payload}");
    assert_eq!(body["messages"], "access field were missings or incorrect");
  }
}

#[actix_web::test]
async fn test_unreadable_stored_hash_is_unauthorized() {
  let state = test_state().await;
  let app = test_app!(state);
  state.repository.create_user("legacy@example.com", "not-a-phc-string").await.unwrap();

  let req = TestRequest::post()
    .uri("/token")
    .set_json(json!({"email": "legacy@example.com", "password": "correct horse"}))
    .to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 401);
  assert_eq!(body["messages"], "access field were missings or incorrect");
}

#[actix_web::test]
async fn test_profile_reports_default_credit() {
  let state = test_state().await;
  let app = test_app!(state);
  let token = signup!(app, "carol@example.com");

  let req = TestRequest::get().uri("/profile").insert_header(bearer(&token)).to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 200);
  assert_eq!(body["user"], "carol@example.com");
  assert_eq!(body["user_credit"], 100);
  assert!(body.get("access_token").is_none(), "fresh tokens are not refreshed");
}

#[actix_web::test]
async fn test_authenticated_routes_reject_missing_and_bad_tokens() {
  let state = test_state().await;
  let app = test_app!(state);

  for uri in ["/profile", "/ping", "/"] {
    let req = TestRequest::get().uri(uri).to_request();
    let (status, body) = call_json!(app, req);
    assert_eq!(status, 401, "{uri}");
    assert!(body["messages"].is_string());
  }

  let req = TestRequest::get().uri("/profile").insert_header(bearer("garbage")).to_request();
  let (status, _) = call_json!(app, req);
  assert_eq!(status, 401);
}

#[actix_web::test]
async fn test_expired_token_is_unauthorized() {
  let state = test_state().await;
  let app = test_app!(state);
  signup!(app, "late@example.com");

  let stale = issue_token_at("late@example.com", &state.config, Utc::now() - Duration::minutes(30)).unwrap();
  let req = TestRequest::get().uri("/profile").insert_header(bearer(&stale.token)).to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 401);
  assert_eq!(body["messages"], "access token is expired");
}

#[actix_web::test]
async fn test_token_for_unknown_user_is_unauthorized_on_profile() {
  let state = test_state().await;
  let app = test_app!(state);

  let orphan = issue_token_at("ghost@example.com", &state.config, Utc::now()).unwrap();
  let req = TestRequest::get().uri("/profile").insert_header(bearer(&orphan.token)).to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 401);
  assert_eq!(body["messages"], "user not found");
}

#[actix_web::test]
async fn test_logout_revokes_token() {
  let state = test_state().await;
  let app = test_app!(state);
  let token = signup!(app, "dave@example.com");

  let req = TestRequest::post().uri("/logout").insert_header(bearer(&token)).to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 200);
  assert_eq!(body["messages"], "logout successful");
  assert_eq!(state.revoked_tokens.len(), 1);

  let req = TestRequest::get().uri("/ping").insert_header(bearer(&token)).to_request();
  let (status, _) = call_json!(app, req);
  assert_eq!(status, 401);

  // A fresh sign-in still works.
  let req = TestRequest::post()
    .uri("/token")
    .set_json(json!({"email": "dave@example.com", "password": "correct horse"}))
    .to_request();
  let (status, _) = call_json!(app, req);
  assert_eq!(status, 200);
}

#[actix_web::test]
async fn test_logout_without_token_still_succeeds() {
  let state = test_state().await;
  let app = test_app!(state);

  let req = TestRequest::post().uri("/logout").to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 200);
  assert_eq!(body["messages"], "logout successful");
  assert!(state.revoked_tokens.is_empty());
}

#[actix_web::test]
async fn test_near_expiry_tokens_are_refreshed() {
  let config = calc_ledger::AppConfig {
    token_ttl_minutes: 1,
    ..test_config()
  };
  let state = test_state_with(config, Arc::new(StubRandomSource::always("abc"))).await;
  let app = test_app!(state);
  let token = signup!(app, "erin@example.com");

  let req = TestRequest::get().uri("/ping").insert_header(bearer(&token)).to_request();
  let (status, body) = call_json!(app, req);
  assert_eq!(status, 200);

  let refreshed = body["access_token"].as_str().expect("refreshed token");
  assert_ne!(refreshed, token);
  let claims = validate_token(refreshed, &state.config).unwrap();
  assert_eq!(claims.sub, "erin@example.com");
  assert_eq!(body["expiration"], claims.exp);
}

#[actix_web::test]
async fn test_health_is_public() {
  let state = test_state().await;
  let app = test_app!(state);

  let req = TestRequest::get().uri("/api/v1/health").to_request();
  let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body, json!({"status": "ok"}));
}
