// calc_ledger/src/storage/repository.rs

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::models::{LedgerRecord, NewRecord, Operation, User};
use crate::services::catalog::CatalogEntry;

use super::{RecordQuery, MIGRATION_001_INITIAL};

const RECORD_COLUMNS: &str = "SELECT r.id, o.operation_type, o.alias, r.operation_response, r.created_at AS date, \
   r.user_balance, r.amount FROM records r JOIN operations o ON o.id = r.operation_id";

/// Latest live record of a user: its id and the balance it left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestEntry {
  pub record_id: i64,
  pub balance: i64,
}

/// Handle to the ledger store. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Repository {
  pool: SqlitePool,
}

impl Repository {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Opens the database, creating the file if needed.
  /// In-memory databases get a single connection so every query sees the same data.
  pub async fn connect(database_url: &str) -> Result<Self> {
    let options = SqliteConnectOptions::from_str(database_url)?
      .create_if_missing(true)
      .foreign_keys(true);
    let pool_options = if database_url.contains(":memory:") {
      SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
    } else {
      SqlitePoolOptions::new().max_connections(5)
    };
    let pool = pool_options.connect_with(options).await?;
    Ok(Self::new(pool))
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::raw_sql(MIGRATION_001_INITIAL).execute(&self.pool).await?;
    debug!("Migration 001 applied.");
    Ok(())
  }

  /// Connect + migrate.
  pub async fn init(database_url: &str) -> Result<Self> {
    let repo = Self::connect(database_url).await?;
    repo.migrate().await?;
    Ok(repo)
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  // ========================
  // Users
  // ========================

  #[instrument(name = "repository::create_user", skip(self, password_hash), err(Display))]
  pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
      r#"
      INSERT INTO users (email, password_hash, status, created_at)
      VALUES (?, ?, 1, ?)
      RETURNING id, email, password_hash, status, created_at, deleted_at
      "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(&self.pool)
    .await?;
    Ok(user)
  }

  pub async fn find_active_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
      "SELECT id, email, password_hash, status, created_at, deleted_at FROM users WHERE email = ? AND deleted_at IS NULL",
    )
    .bind(email)
    .fetch_optional(&self.pool)
    .await?;
    Ok(user)
  }

  /// Counts soft-deleted users too: their email stays taken.
  pub async fn user_exists(&self, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
      .bind(email)
      .fetch_one(&self.pool)
      .await?;
    Ok(count > 0)
  }

  // ========================
  // Operation catalog
  // ========================

  /// Inserts missing catalog entries; existing aliases are left untouched.
  #[instrument(name = "repository::seed_operations", skip_all, fields(entries = entries.len()), err(Display))]
  pub async fn seed_operations(&self, entries: &[CatalogEntry]) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    let mut inserted = 0u64;
    for entry in entries {
      inserted += sqlx::query("INSERT OR IGNORE INTO operations (operation_type, alias, cost) VALUES (?, ?, ?)")
        .bind(entry.operation_type)
        .bind(entry.alias)
        .bind(entry.cost)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }
    tx.commit().await?;
    info!(inserted, "Operation catalog seeded.");
    Ok(())
  }

  pub async fn list_operations(&self) -> Result<Vec<Operation>> {
    let operations = sqlx::query_as::<_, Operation>(
      "SELECT id, operation_type, alias, cost FROM operations WHERE deleted_at IS NULL ORDER BY id",
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(operations)
  }

  /// Exact alias match.
  pub async fn operation_by_alias(&self, alias: &str) -> Result<Option<Operation>> {
    let operation = sqlx::query_as::<_, Operation>(
      "SELECT id, operation_type, alias, cost FROM operations WHERE alias = ? AND deleted_at IS NULL",
    )
    .bind(alias)
    .fetch_optional(&self.pool)
    .await?;
    Ok(operation)
  }

  // ========================
  // Ledger records
  // ========================

  pub async fn latest_record_for_user(&self, user_id: i64) -> Result<Option<LatestEntry>> {
    let row: Option<(i64, i64)> = sqlx::query_as(
      "SELECT id, user_balance FROM records WHERE user_id = ? AND deleted_at IS NULL ORDER BY id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row.map(|(record_id, balance)| LatestEntry { record_id, balance }))
  }

  /// Appends `record` only if the user's latest live record is still `expected_latest`
  /// (`None`: the user had no records).
  ///
  /// Returns `Ok(None)` when another charge got there first. Database failures are
  /// reported as `AppError::Persistence` after the transaction is rolled back.
  #[instrument(
    name = "repository::insert_record_guarded",
    skip(self, record),
    fields(user_id = record.user_id, operation_id = record.operation_id, balance_after = record.user_balance),
    err(Display)
  )]
  pub async fn insert_record_guarded(
    &self,
    record: &NewRecord,
    expected_latest: Option<i64>,
  ) -> Result<Option<LedgerRecord>> {
    let mut tx = self.pool.begin().await.map_err(persistence_error)?;

    let outcome = sqlx::query(
      r#"
      INSERT INTO records (operation_id, user_id, amount, user_balance, operation_response, created_at)
      SELECT ?, ?, ?, ?, ?, ?
      WHERE COALESCE((SELECT MAX(id) FROM records WHERE user_id = ? AND deleted_at IS NULL), 0) = ?
      "#,
    )
    .bind(record.operation_id)
    .bind(record.user_id)
    .bind(record.amount)
    .bind(record.user_balance)
    .bind(Json(&record.operation_response))
    .bind(record.created_at)
    .bind(record.user_id)
    .bind(expected_latest.unwrap_or(0))
    .execute(&mut *tx)
    .await;

    let done = match outcome {
      Ok(done) => done,
      Err(e) => {
        error!(error = %e, "Record insert failed, rolling back.");
        tx.rollback().await.map_err(persistence_error)?;
        return Err(persistence_error(e));
      }
    };

    if done.rows_affected() == 0 {
      warn!(?expected_latest, "Ledger moved since the balance was read; record not written.");
      tx.rollback().await.map_err(persistence_error)?;
      return Ok(None);
    }

    let inserted = sqlx::query_as::<_, LedgerRecord>(&format!("{RECORD_COLUMNS} WHERE r.id = ?"))
      .bind(done.last_insert_rowid())
      .fetch_one(&mut *tx)
      .await
      .map_err(persistence_error)?;
    tx.commit().await.map_err(persistence_error)?;

    debug!(record_id = inserted.id, "Record appended.");
    Ok(Some(inserted))
  }

  pub async fn count_records(&self, user_id: i64, query: &RecordQuery) -> Result<i64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM records r");
    query.push_filters(&mut builder, user_id);
    let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
    Ok(total)
  }

  pub async fn list_records(&self, user_id: i64, query: &RecordQuery) -> Result<Vec<LedgerRecord>> {
    let mut builder = QueryBuilder::<Sqlite>::new(RECORD_COLUMNS);
    query.push_filters(&mut builder, user_id);
    query.push_order_and_window(&mut builder);
    let records = builder.build_query_as::<LedgerRecord>().fetch_all(&self.pool).await?;
    Ok(records)
  }
}

fn persistence_error(e: sqlx::Error) -> AppError {
  AppError::Persistence(e.to_string())
}
