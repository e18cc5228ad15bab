//! # Sale Commands
//!
//! Checkout and the transaction history.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    warung sell p-1:2 p-2                                │
//! │                                                                         │
//! │  1. Load each product (NOT_FOUND if an id is unknown)                   │
//! │  2. Build a Cart: snapshots name + price, refuses qty > stock           │
//! │  3. SaleExecutor::execute(session, cart lines, cart total)              │
//! │        └─ re-reads live stock inside one unit, retries on conflict      │
//! │  4. Print the receipt                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 2 only gives early feedback; step 3 is what guarantees no oversell.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::{Context, Render};
use crate::error::{CliError, CliResult};
use warung_core::{Cart, CartLine, Money, Transaction, TransactionKind};

/// A ledger entry as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionDto {
    pub id: String,
    pub kind: TransactionKind,
    pub description: String,
    pub items: Vec<CartLine>,
    pub note: Option<String>,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    /// `created_at` in the shop's offset.
    pub local_time: String,
    pub recorded_by: String,
}

impl TransactionDto {
    pub fn new(ctx: &Context, t: Transaction) -> Self {
        TransactionDto {
            description: t.description(),
            local_time: ctx.local_time(t.created_at),
            id: t.id,
            kind: t.kind,
            items: t.items,
            note: t.note,
            total: t.total,
            created_at: t.created_at,
            recorded_by: t.recorded_by,
        }
    }

    /// One table row: time, kind, amount, description.
    pub fn row(&self) -> String {
        let sign = match self.kind {
            TransactionKind::Sale => "+",
            TransactionKind::Expense => "-",
        };
        format!(
            "{}  {:<7}  {}{:>13}  {}",
            self.local_time,
            self.kind.as_str(),
            sign,
            Money::from_units(self.total).to_string(),
            self.description
        )
    }
}

impl Render for TransactionDto {
    fn render(&self) -> String {
        let mut out = format!(
            "{} {} at {} by {}",
            match self.kind {
                TransactionKind::Sale => "Sale",
                TransactionKind::Expense => "Expense",
            },
            self.id,
            self.local_time,
            self.recorded_by
        );

        for line in &self.items {
            out.push_str(&format!(
                "\n  {:<28} {:>4} x {:>10}  {:>12}",
                line.product_name,
                line.qty,
                Money::from_units(line.unit_price).to_string(),
                line.line_total().to_string()
            ));
        }
        if let Some(note) = &self.note {
            out.push_str(&format!("\n  {}", note));
        }
        out.push_str(&format!("\n  Total: {}", Money::from_units(self.total)));
        out
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct History(pub Vec<TransactionDto>);

impl Render for History {
    fn render(&self) -> String {
        if self.0.is_empty() {
            return "No transactions yet.".to_string();
        }
        self.0.iter().map(TransactionDto::row).collect::<Vec<_>>().join("\n")
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Sells `(product_id, qty)` lines as one sale.
///
/// Repeated ids are merged into one cart line.
pub async fn sell(ctx: &Context, lines: &[(String, i64)]) -> CliResult<TransactionDto> {
    debug!(lines = lines.len(), user = %ctx.session.user_id, "sell command");

    let products = ctx.db.products();
    let mut cart = Cart::new();
    for (id, qty) in lines {
        let product = products
            .get_by_id(id)
            .await?
            .ok_or_else(|| CliError::not_found("Product", id))?;
        cart.add_quantity(&product, *qty)?;
    }

    let sale = ctx
        .db
        .sales()
        .execute(&ctx.session, cart.lines(), cart.total().units())
        .await?;

    Ok(TransactionDto::new(ctx, sale))
}

/// Every transaction, newest first.
pub async fn history(ctx: &Context) -> CliResult<History> {
    let transactions = ctx.db.transactions().list().await?;
    Ok(History(
        transactions
            .into_iter()
            .map(|t| TransactionDto::new(ctx, t))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, product};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_sell_decrements_and_records() {
        let ctx = context().await;
        let lenjer = product(&ctx, "Pempek Lenjer", 10, 8_000, "Pempek").await;
        let adaan = product(&ctx, "Pempek Adaan", 5, 5_000, "Pempek").await;

        let receipt = sell(
            &ctx,
            &[
                (lenjer.id.clone(), 2),
                (adaan.id.clone(), 1),
                (lenjer.id.clone(), 1),
            ],
        )
        .await
        .unwrap();

        assert_eq!(receipt.kind, TransactionKind::Sale);
        assert_eq!(receipt.total, 3 * 8_000 + 5_000);
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.recorded_by, "owner");
        assert!(receipt.render().contains("Total: Rp 29.000"));

        let stock = ctx.db.products().get_by_id(&lenjer.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 7);
    }

    #[tokio::test]
    async fn test_sell_more_than_stock_is_refused() {
        let ctx = context().await;
        let pistel = product(&ctx, "Pempek Pistel", 2, 5_000, "Pempek").await;

        let err = sell(&ctx, &[(pistel.id.clone(), 3)]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("short by 1"));

        assert!(history(&ctx).await.unwrap().0.is_empty());
    }

    #[tokio::test]
    async fn test_sell_unknown_product() {
        let ctx = context().await;
        let err = sell(&ctx, &[("ghost".to_string(), 1)]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_history_rows() {
        let ctx = context().await;
        let es = product(&ctx, "Es Teh Manis", 10, 4_000, "Minuman").await;
        sell(&ctx, &[(es.id, 2)]).await.unwrap();

        let history = history(&ctx).await.unwrap();
        assert_eq!(history.0.len(), 1);
        assert!(history.render().contains("+"));
        assert!(history.render().contains("Es Teh Manis (2)"));
    }
}
