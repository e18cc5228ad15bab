//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (rule violation)          │
//! │       │                                 │                               │
//! │       ▼                                 ▼                               │
//! │  DbError (this module) ◄────── Domain(CoreError)                       │
//! │       │                                                                 │
//! │       │  BUSY / LOCKED / stale version ──► Conflict ──► retried        │
//! │       ▼                                                                 │
//! │  CliError (in the binary) ← code + message for the terminal            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use warung_core::{CoreError, ValidationError};

/// SQLite primary result codes that mean "someone else is writing".
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist (or the product was deleted)
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - A line snapshot is written for a transaction that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A concurrent writer changed the data this unit read.
    ///
    /// ## When This Occurs
    /// - SQLite reports BUSY/LOCKED (including BUSY_SNAPSHOT in WAL mode)
    /// - A stock update finds the product's `version` already moved on
    ///
    /// Always safe to retry: the attempt that saw it has been rolled back.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Conflicts kept happening until the retry budget ran out.
    #[error("Gave up after {attempts} attempts due to concurrent writes")]
    RetriesExhausted { attempts: u32 },

    /// A stored record cannot be interpreted.
    ///
    /// ## When This Occurs
    /// - A transaction row has a `kind` other than `sale`/`expense`
    #[error("Corrupt {entity} record {id}: {reason}")]
    Corrupt {
        entity: String,
        id: String,
        reason: String,
    },

    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - Runtime SQL error
    /// - CHECK constraint failure (e.g. stock would go negative)
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Corrupt error for a stored record.
    pub fn corrupt(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DbError::Corrupt {
            entity: entity.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Whether the operation may succeed if simply run again.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }

    /// The wrapped business rule violation, if any.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → BUSY/LOCKED → Conflict, FK → ForeignKeyViolation,
///                               anything else (UNIQUE, CHECK, triggers) → QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // Extended codes keep the primary code in the low byte
                // (517 = SQLITE_BUSY_SNAPSHOT, 262 = SQLITE_LOCKED_SHAREDCACHE).
                let primary = db_err
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);

                if matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED)) {
                    DbError::Conflict(msg.to_string())
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        assert!(DbError::Conflict("stale".into()).is_conflict());
        assert!(!DbError::RetriesExhausted { attempts: 3 }.is_conflict());
        assert!(!DbError::Domain(CoreError::EmptyCart).is_conflict());
    }

    #[test]
    fn test_validation_wraps_as_domain() {
        let err: DbError = ValidationError::Required {
            field: "note".to_string(),
        }
        .into();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_domain_message_is_transparent() {
        let err = DbError::from(CoreError::EmptyCart);
        assert_eq!(err.to_string(), "Cart is empty");
    }
}
