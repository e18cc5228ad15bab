//! # Domain Types
//!
//! Core domain types used throughout Warung.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    CartLine     │   │  Transaction    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  product_id     │   │  id (UUID)      │       │
//! │  │  name           │   │  product_name ❄ │──►│  kind           │       │
//! │  │  stock (>= 0)   │   │  qty (>= 1)     │   │  items / note   │       │
//! │  │  price (> 0)    │   │  unit_price ❄   │   │  total          │       │
//! │  │  category       │   └─────────────────┘   │  created_at     │       │
//! │  │  version        │    ❄ = frozen at sale   │  recorded_by    │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Products are mutable catalogue records. Transactions are the audit
//! trail: created once, never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Session
// =============================================================================

/// Who is operating the till.
///
/// Passed explicitly into every write that records an actor, instead of
/// being read from an ambient signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Session {
            user_id: user_id.into(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stock item in the shop's catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, trimmed.
    pub name: String,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Unit price in whole currency units.
    pub price: i64,

    /// Normalized category label.
    pub category: String,

    /// Reference to an externally stored photo.
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Bumped by every write; the sale executor uses it to detect
    /// concurrent modification.
    pub version: i64,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_units(self.price)
    }

    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0
    }

    /// Selling value of everything on hand (`stock × price`).
    pub fn inventory_value(&self) -> Money {
        self.unit_price().multiply_quantity(self.stock.max(0))
    }
}

/// Input for creating or editing a product.
///
/// Run it through [`crate::validation::validate_new_product`] before it
/// reaches the store; that step trims text and normalizes the category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub stock: i64,
    pub price: i64,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

// =============================================================================
// Cart Line
// =============================================================================

/// One product + quantity + price entry of a sale.
///
/// Name and unit price are snapshots taken when the line was created, so a
/// later price change never rewrites historical totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    pub qty: i64,
    pub unit_price: i64,
}

impl CartLine {
    /// Snapshots a product into a line.
    pub fn from_product(product: &Product, qty: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            qty,
            unit_price: product.price,
        }
    }

    /// `qty × unit_price`.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_units(self.unit_price).multiply_quantity(self.qty)
    }
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// Whether money came in (sale) or went out (expense).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sale" => Ok(TransactionKind::Sale),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(ValidationError::InvalidFormat {
                field: "kind".to_string(),
                reason: format!("unknown transaction kind '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// An immutable entry in the shop's ledger.
///
/// Sales carry `items` and no note; expenses carry a `note` and no items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub items: Vec<CartLine>,
    pub note: Option<String>,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub recorded_by: String,
}

impl Transaction {
    #[inline]
    pub fn total_money(&self) -> Money {
        Money::from_units(self.total)
    }

    #[inline]
    pub fn is_sale(&self) -> bool {
        self.kind == TransactionKind::Sale
    }

    /// One-line description: `"Lenjer (2), Adaan (5)"` for a sale, the
    /// note for an expense.
    pub fn description(&self) -> String {
        match self.kind {
            TransactionKind::Sale => self
                .items
                .iter()
                .map(|i| format!("{} ({})", i.product_name, i.qty))
                .collect::<Vec<_>>()
                .join(", "),
            TransactionKind::Expense => self.note.clone().unwrap_or_default(),
        }
    }
}

/// Input for recording money spent (ingredients, gas, packaging...).
///
/// `occurred_at` is chosen by the caller so expenses can be back-dated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub note: String,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
