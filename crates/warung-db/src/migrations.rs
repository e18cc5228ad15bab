//! # Database Migrations
//!
//! Embedded SQL migrations for the Warung store.
//!
//! Applied every time a [`crate::Database`] opens (unless disabled in
//! [`crate::DbConfig`]), so a fresh file and an in-memory test database end
//! up with the same schema:
//!
//! ```text
//! Database::new ──► MIGRATOR.run ──► _sqlx_migrations bookkeeping
//!                        │
//!                        ├── 001_initial_schema.sql
//!                        │     products / transactions / transaction_items
//!                        │     + append-only triggers on transactions
//!                        └── 002_immutable_sale_items.sql
//!                              append-only triggers on transaction_items
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql` (e.g., `003_add_supplier_table.sql`)
//! 3. Write idempotent SQL (use `IF NOT EXISTS` where possible)
//! 4. **NEVER** modify existing migrations - always add new ones
//!
//! Queries are checked at runtime, so no offline query data needs updating.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// Embedded at compile time from `migrations/sqlite`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Brings the schema up to date. Already-applied migrations are skipped.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    info!("Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
///
/// A store that was never migrated has no bookkeeping table and reports
/// zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let has_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if has_table == 0 {
        0
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    };

    Ok((MIGRATOR.migrations.len(), applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_status_before_and_after() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        let (embedded, applied) = migration_status(db.pool()).await.unwrap();
        assert!(embedded >= 1);
        assert_eq!(applied, 0);

        run_migrations(db.pool()).await.unwrap();
        run_migrations(db.pool()).await.unwrap();
        assert_eq!(migration_status(db.pool()).await.unwrap(), (embedded, embedded));
    }
}
