//! # warung-db: Database Layer for Warung
//!
//! SQLite storage for the catalogue and the ledger, plus the one operation
//! with a real concurrency invariant: the sale executor.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Warung Data Flow                                 │
//! │                                                                         │
//! │  warung sell <id>:<qty> ...                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     warung-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌─────────────────────┐  ┌─────────────┐  │   │
//! │  │   │   Database    │  │    Repositories     │  │ Migrations  │  │   │
//! │  │   │   (pool.rs)   │  │                     │  │ (embedded)  │  │   │
//! │  │   │               │  │ ProductRepository   │  │             │  │   │
//! │  │   │ SqlitePool    │◄─│ TransactionRepo...  │  │ 001_initial │  │   │
//! │  │   │ WAL, FKs on   │  │ SaleExecutor ──┐    │  │             │  │   │
//! │  │   └───────────────┘  └────────────────┼────┘  └─────────────┘  │   │
//! │  │                                       ▼                         │   │
//! │  │                           retry_on_conflict (retry.rs)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (path from warung.toml or --db)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`retry`] - Bounded retry on write conflicts
//! - [`repository`] - Products, ledger, sale executor
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warung_core::{Cart, Session};
//! use warung_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("warung.db")).await?;
//!
//! let Some(lenjer) = db.products().get_by_id(&id).await? else { return Ok(()) };
//! let mut cart = Cart::new();
//! cart.add(&lenjer)?;
//!
//! let sale = db
//!     .sales()
//!     .execute(&Session::new("owner"), cart.lines(), cart.total().units())
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod retry;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use retry::{retry_on_conflict, RetryPolicy};

// Repository re-exports for convenience
pub use repository::product::ProductRepository;
pub use repository::sale::SaleExecutor;
pub use repository::transaction::TransactionRepository;
