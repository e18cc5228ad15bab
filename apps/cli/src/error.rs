//! # CLI Error Type
//!
//! What the shop owner sees when a command fails.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Warung                                 │
//! │                                                                         │
//! │  Command function ── Result<Output, CliError>                          │
//! │         │                                                               │
//! │         ├── DbError::Domain(InsufficientStock) ──► INSUFFICIENT_STOCK   │
//! │         ├── DbError::NotFound / ProductNotFound ─► NOT_FOUND            │
//! │         ├── ValidationError / bad arguments ─────► VALIDATION_ERROR     │
//! │         ├── Conflict / RetriesExhausted ─────────► RETRY                │
//! │         └── anything else ───────────────────────► DATABASE_ERROR ...   │
//! │                                                                         │
//! │  Text mode:  "error[INSUFFICIENT_STOCK]: Not enough Lenjer ..."         │
//! │  --json:     {"code":"INSUFFICIENT_STOCK","message":"..."}              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::process::ExitCode;
use warung_core::{CoreError, ValidationError};
use warung_db::DbError;

/// Error returned by every command.
#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    /// Machine-readable error code for scripts
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product or transaction does not exist
    NotFound,

    /// Live stock is below what was asked for
    InsufficientStock,

    /// Input failed validation
    ValidationError,

    /// Concurrent writes kept winning; trying again may work
    Retry,

    /// Command line could not be understood
    UsageError,

    /// Configuration file or environment is invalid
    ConfigError,

    /// Store failure
    DatabaseError,

    /// Anything unexpected
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Retry => "RETRY",
            ErrorCode::UsageError => "USAGE_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl CliError {
    /// Creates a new CLI error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CliError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ValidationError, message)
    }

    pub fn usage(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::UsageError, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ConfigError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::Internal, message)
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self.code {
            ErrorCode::UsageError => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

fn retry_message() -> String {
    "The shop is busy right now (stock changed while saving). Please try again.".to_string()
}

/// Converts database errors to CLI errors.
impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => CliError::not_found(&entity, &id),
            DbError::Conflict(reason) => {
                tracing::warn!(%reason, "Write conflict reached the user");
                CliError::new(ErrorCode::Retry, retry_message())
            }
            DbError::RetriesExhausted { attempts } => {
                tracing::warn!(attempts, "Sale retries exhausted");
                CliError::new(ErrorCode::Retry, retry_message())
            }
            DbError::Corrupt { entity, id, reason } => {
                tracing::error!(%entity, %id, %reason, "Corrupt record");
                CliError::new(
                    ErrorCode::DatabaseError,
                    format!("Stored {} {} is unreadable: {}", entity, id, reason),
                )
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                CliError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                CliError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                CliError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                CliError::new(ErrorCode::DatabaseError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                CliError::new(ErrorCode::DatabaseError, "Database is busy, no free connection")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                CliError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to CLI errors.
impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound {
                product_id,
                product_name,
            } => CliError::new(
                ErrorCode::NotFound,
                format!("Product {} ({}) no longer exists", product_name, product_id),
            ),
            CoreError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            } => CliError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Not enough {}: {} left, {} requested (short by {})",
                    product_name,
                    available,
                    requested,
                    requested - available
                ),
            ),
            CoreError::EmptyCart => CliError::validation("Nothing to sell: the cart is empty"),
            CoreError::TotalMismatch {
                submitted,
                computed,
            } => CliError::validation(format!(
                "Sale total {} does not match the items ({})",
                submitted, computed
            )),
            CoreError::CartTooLarge { max } => {
                CliError::validation(format!("A sale cannot have more than {} lines", max))
            }
            CoreError::QuantityTooLarge { requested, max } => CliError::validation(format!(
                "Quantity {} exceeds maximum allowed ({})",
                requested, max
            )),
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::validation(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(format!("Could not encode output: {}", err))
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error[{}]: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
