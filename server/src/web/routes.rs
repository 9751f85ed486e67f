// calc_ledger/src/web/routes.rs

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::errors::AppError;
use crate::web::handlers::{auth_handlers, calc_handlers, operation_handlers, record_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed or non-JSON bodies become a 400 with the usual error body.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("invalid JSON body: {}", err)).into()
}

/// Called from `main.rs` and the integration tests to mount every route.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(json_error_handler))
    // Session routes at the root
    .route("/create_user", web::post().to(auth_handlers::create_user_handler))
    .route("/token", web::post().to(auth_handlers::token_handler))
    .route("/logout", web::post().to(auth_handlers::logout_handler))
    .route("/profile", web::get().to(auth_handlers::profile_handler))
    .route("/ping", web::get().to(auth_handlers::ping_handler))
    .route("/", web::get().to(auth_handlers::index_handler))
    .service(
      web::scope("/api/v1")
        .route("/health", web::get().to(health_check_handler))
        .route("/operations", web::get().to(operation_handlers::list_operations_handler))
        .route("/profile/records", web::post().to(record_handlers::list_records_handler))
        .route("/service/calc", web::post().to(calc_handlers::calc_handler)),
    );
}
