//! # Reports
//!
//! Pure reductions over already-fetched transactions and products.
//!
//! ## Report Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transactions (newest first, from the store)                            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ReportPeriod::contains(created_at, local offset)                       │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ProfitLoss { income = Σ sale, expense = Σ expense, net }               │
//! │                                                                         │
//! │  products ──► StockSummary { units, value, out of stock, low stock }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bucketing happens in the caller's local offset: a sale at 23:59 local time
//! belongs to that local day even when the stored UTC instant is on another
//! date.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Product, Transaction, TransactionKind};
use crate::validation::{normalize_category, ValidationResult};

// =============================================================================
// Report Period
// =============================================================================

/// A calendar bucket a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
}

impl ReportPeriod {
    /// The local calendar day containing `instant`.
    pub fn day_containing(instant: DateTime<Utc>, offset: &FixedOffset) -> Self {
        ReportPeriod::Day(instant.with_timezone(offset).date_naive())
    }

    /// The local calendar month containing `instant`.
    pub fn month_containing(instant: DateTime<Utc>, offset: &FixedOffset) -> Self {
        let local = instant.with_timezone(offset);
        ReportPeriod::Month {
            year: local.year(),
            month: local.month(),
        }
    }

    /// Whether `instant`, seen in `offset`, falls inside this bucket.
    pub fn contains(&self, instant: DateTime<Utc>, offset: &FixedOffset) -> bool {
        let local = instant.with_timezone(offset).date_naive();
        match *self {
            ReportPeriod::Day(day) => local == day,
            ReportPeriod::Month { year, month } => local.year() == year && local.month() == month,
        }
    }

    /// Parses `YYYY-MM-DD`.
    pub fn parse_day(raw: &str) -> ValidationResult<Self> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(ReportPeriod::Day)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "date".to_string(),
                reason: format!("expected YYYY-MM-DD ({})", e),
            })
    }

    /// Parses `YYYY-MM`.
    pub fn parse_month(raw: &str) -> ValidationResult<Self> {
        let invalid = || ValidationError::InvalidFormat {
            field: "month".to_string(),
            reason: "expected YYYY-MM".to_string(),
        };

        let (y, m) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;

        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(ReportPeriod::Month { year, month })
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportPeriod::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
            ReportPeriod::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
        }
    }
}

// =============================================================================
// Profit / Loss
// =============================================================================

/// Income, expense and net for one period, with the transactions counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitLoss {
    pub period: ReportPeriod,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    /// Transactions inside the period, newest first.
    pub transactions: Vec<Transaction>,
}

impl ProfitLoss {
    /// Filters `transactions` to `period` and sums them by kind.
    ///
    /// Sums saturate at the `i64` bounds.
    pub fn compute(transactions: &[Transaction], period: ReportPeriod, offset: &FixedOffset) -> Self {
        let mut selected: Vec<Transaction> = transactions
            .iter()
            .filter(|t| period.contains(t.created_at, offset))
            .cloned()
            .collect();
        // Stable, so equal timestamps keep the store's order.
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut income = Money::zero();
        let mut expense = Money::zero();
        for t in &selected {
            match t.kind {
                TransactionKind::Sale => income += t.total_money(),
                TransactionKind::Expense => expense += t.total_money(),
            }
        }

        ProfitLoss {
            period,
            income,
            expense,
            net: income - expense,
            transactions: selected,
        }
    }
}

// =============================================================================
// Stock Summary
// =============================================================================

/// Snapshot of the catalogue for the stock report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub product_count: usize,
    pub total_units: i64,
    pub inventory_value: Money,
    pub out_of_stock: usize,
    pub low_stock_threshold: i64,
    /// Products at or below the threshold, lowest stock first.
    pub low_stock: Vec<Product>,
}

impl StockSummary {
    /// Figures saturate at the `i64` bounds rather than overflow.
    pub fn compute(products: &[Product], low_stock_threshold: i64) -> Self {
        let mut low_stock: Vec<Product> = products
            .iter()
            .filter(|p| p.stock <= low_stock_threshold)
            .cloned()
            .collect();
        low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

        StockSummary {
            product_count: products.len(),
            total_units: products
                .iter()
                .fold(0i64, |acc, p| acc.saturating_add(p.stock.max(0))),
            inventory_value: products.iter().map(Product::inventory_value).sum(),
            out_of_stock: products.iter().filter(|p| p.is_out_of_stock()).count(),
            low_stock_threshold,
            low_stock,
        }
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Distinct normalized categories, sorted.
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .map(|p| normalize_category(Some(&p.category)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Products whose normalized category equals the normalized `category`.
pub fn filter_by_category<'a>(products: &'a [Product], category: &str) -> Vec<&'a Product> {
    let wanted = normalize_category(Some(category));
    products
        .iter()
        .filter(|p| normalize_category(Some(&p.category)) == wanted)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
