//! # Store Handle
//!
//! Opens the SQLite file, applies migrations and hands out repositories.
//!
//! ## Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database (Clone) ──► SqlitePool ──► up to max_connections              │
//! │                                                                         │
//! │  Two tills checking out at once:                                        │
//! │                                                                         │
//! │    till A ── BEGIN ── read stock ── write ── COMMIT ✓                   │
//! │    till B ── BEGIN ── read stock ────────── write ✗ BUSY_SNAPSHOT       │
//! │                                               │                         │
//! │                                               └─► DbError::Conflict     │
//! │                                                   rollback + retry      │
//! │                                                   (sees A's stock)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The file runs in WAL journal mode: readers never wait for the writer, and
//! a writer whose snapshot went stale fails fast instead of overwriting.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleExecutor;
use crate::repository::transaction::TransactionRepository;
use crate::retry::RetryPolicy;

const MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the store.
///
/// ```rust,ignore
/// let config = DbConfig::new("/home/toko/warung.db")
///     .max_connections(4)
///     .sale_retry(RetryPolicy::new(8));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; created on first open. `:memory:` for a throwaway store.
    pub database_path: PathBuf,

    /// Pool ceiling. One shop rarely needs more than a handful.
    pub max_connections: u32,

    /// How long to wait for a free pooled connection.
    pub acquire_timeout: Duration,

    /// How long SQLite waits on a locked file before reporting BUSY.
    pub busy_timeout: Duration,

    /// Apply embedded migrations when opening.
    pub run_migrations: bool,

    /// Conflict retry budget handed to [`SaleExecutor`].
    pub sale_retry: RetryPolicy,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            sale_retry: RetryPolicy::default(),
        }
    }

    /// Private single-connection store for tests.
    ///
    /// Every pooled connection to `:memory:` would see its own empty
    /// database, so the pool is pinned to one.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn sale_retry(mut self, policy: RetryPolicy) -> Self {
        self.sale_retry = policy;
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = format!("sqlite://{}?mode=rwc", self.database_path.display());

        Ok(SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // transaction_items.transaction_id references transactions
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the store. Clone it freely and pass it explicitly.
///
/// ```text
/// Database
/// ├── products()      → ProductRepository      catalogue CRUD
/// ├── transactions()  → TransactionRepository  ledger reads, expenses
/// └── sales()         → SaleExecutor           atomic checkout
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    sale_retry: RetryPolicy,
}

impl Database {
    /// Opens (creating if needed) the store described by `config`.
    ///
    /// ## Returns
    /// * `Ok(Database)` - Pool connected, schema current
    /// * `Err(DbError::ConnectionFailed)` - File could not be opened
    /// * `Err(DbError::MigrationFailed)` - Schema could not be brought up to date
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening store");

        let options = config.connect_options()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Pool ready"
        );

        let db = Database {
            pool,
            sale_retry: config.sale_retry,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies any embedded migrations not yet recorded.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    /// Checkout, using the retry policy this store was opened with.
    pub fn sales(&self) -> SaleExecutor {
        SaleExecutor::new(self.pool.clone(), self.sale_retry.clone())
    }

    /// Waits for in-flight work and closes every connection.
    pub async fn close(&self) {
        debug!("Closing store");
        self.pool.close().await;
    }

    /// `true` when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_is_usable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (embedded, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(embedded, applied);
        assert_eq!(db.products().count().await.unwrap(), 0);
        assert_eq!(db.transactions().count().await.unwrap(), 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/toko.db")
            .max_connections(8)
            .busy_timeout(Duration::from_millis(250))
            .sale_retry(RetryPolicy::new(9));

        assert_eq!(config.max_connections, 8);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.sale_retry.max_attempts, 9);
        assert!(config.run_migrations);

        let memory = DbConfig::in_memory();
        assert_eq!(memory.max_connections, 1);
        assert_eq!(memory.database_path, PathBuf::from(MEMORY));
    }

    #[tokio::test]
    async fn test_without_migrations_has_no_schema() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        assert!(db.products().count().await.is_err());

        db.run_migrations().await.unwrap();
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_store_fails_health_check() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }
}
