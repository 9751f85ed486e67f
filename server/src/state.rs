// calc_ledger/src/state.rs

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::pipelines;
use crate::services::catalog::DEFAULT_CATALOG;
use crate::services::random_org::{RandomOrgClient, RandomStringSource};
use crate::services::token_service::RevokedTokens;
use crate::storage::Repository;
use billflow::FlowRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Everything a request handler or pipeline step needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
  pub repository: Repository,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
  pub random_source: Arc<dyn RandomStringSource>,
  pub revoked_tokens: Arc<RevokedTokens>,
}

impl AppState {
  /// Builds the state around an opened store and registers every pipeline.
  pub fn new(repository: Repository, config: AppConfig, random_source: Arc<dyn RandomStringSource>) -> Result<Self> {
    let flows = FlowRegistry::<AppError>::new();
    pipelines::register_all_pipelines(&flows)?;
    Ok(Self {
      repository,
      flows: Arc::new(flows),
      config: Arc::new(config),
      random_source,
      revoked_tokens: Arc::new(RevokedTokens::new()),
    })
  }

  /// Opens and migrates the configured database, seeds the catalog if asked,
  /// and wires the random.org client.
  pub async fn initialise(config: AppConfig) -> Result<Self> {
    let repository = Repository::init(&config.database_url).await?;
    if config.seed_db {
      repository.seed_operations(DEFAULT_CATALOG).await?;
    }
    let random_source = RandomOrgClient::new(
      config.random_org_url.clone(),
      Duration::from_secs(config.random_org_timeout_secs),
    )?;
    Self::new(repository, config, Arc::new(random_source))
  }
}
