// calc_ledger/src/main.rs

use calc_ledger::{web, AppConfig, AppState};

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting calc ledger server...");

  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);

  let app_state = AppState::initialise(app_config)
    .await
    .context("Failed to initialise application state")?;
  tracing::info!("Ledger store ready and pipelines registered.");

  tracing::info!("Attempting to bind server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;

  Ok(())
}
