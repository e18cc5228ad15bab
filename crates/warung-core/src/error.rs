//! # Error Types
//!
//! Domain-specific error types for warung-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  warung-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  warung-db errors (separate crate)                                     │
//! │  └── DbError          - Store failures, conflicts, wraps CoreError     │
//! │                                                                         │
//! │  CLI errors (in app)                                                   │
//! │  └── CliError         - What the shop owner sees                       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → CliError → terminal     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Every variant carries enough context (product id and name, quantities)
/// for the caller to tell the user exactly which line failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A cart line references a product that no longer exists.
    ///
    /// ## When This Occurs
    /// - The product was deleted between building the cart and checkout
    /// - The id was typed by hand and is wrong
    #[error("Product not found: {product_name} ({product_id})")]
    ProductNotFound {
        product_id: String,
        product_name: String,
    },

    /// Live stock is below the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 3)
    ///      │
    ///      ▼
    /// Live stock read inside the atomic unit: 2
    ///      │
    ///      ▼
    /// InsufficientStock { requested: 3, available: 2 }
    ///      │
    ///      ▼
    /// "Not enough Pempek Lenjer: 2 left, 3 requested"
    /// ```
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// Checkout was attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The submitted sale total does not equal the sum of its lines.
    #[error("Sale total {submitted} does not match line total {computed}")]
    TotalMismatch { submitted: i64, computed: i64 },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds the maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Units missing to satisfy the request, for stock failures.
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => Some(requested - available),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. unparseable date or number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
