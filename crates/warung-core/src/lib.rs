//! # warung-core: Pure Business Logic for Warung
//!
//! Everything in this crate is deterministic and free of I/O. The store,
//! the clock and the terminal all live in other crates; values come in as
//! arguments and results go out as return values.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Warung Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    warung (CLI)                                 │   │
//! │  │    products ─► sell ─► expense ─► report                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ warung-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │validation │ │ report │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └───────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    warung-db (Database Layer)                   │   │
//! │  │        SQLite, migrations, repositories, sale executor          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CartLine, Transaction, Session)
//! - [`money`] - Whole-unit money type with integer arithmetic
//! - [`cart`] - Cart building before checkout
//! - [`report`] - Profit/loss and stock summaries over fetched records
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules and category normalization
//!
//! ## Example Usage
//!
//! ```rust
//! use warung_core::money::Money;
//!
//! let price = Money::from_units(12_000);
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.units(), 36_000);
//! assert_eq!(line.to_string(), "Rp 36.000");
//! ```

pub mod cart;
pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

pub use cart::Cart;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use report::{ProfitLoss, ReportPeriod, StockSummary};
pub use types::*;

/// Label used for products saved without a category.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Name shown for product records stored without a usable name.
pub const UNNAMED_PRODUCT: &str = "Unnamed";

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches slips like typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price a product may carry (Rp 1.000.000.000).
pub const MAX_PRICE: i64 = 1_000_000_000;

/// Highest stock count a product may carry.
///
/// With [`MAX_PRICE`] this keeps `stock × price` far inside `i64`.
pub const MAX_STOCK: i64 = 1_000_000;

/// Products at or below this stock count show up in the low-stock list.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
