//! # Transaction Repository
//!
//! The append-only ledger of sales and expenses.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transactions                        transaction_items                  │
//! │  ┌───────────────────────────┐       ┌───────────────────────────────┐  │
//! │  │ seq (insertion order)     │       │ transaction_id ───────────────┼──┤
//! │  │ id ◄──────────────────────┼───────│ position (caller's order)     │  │
//! │  │ kind  sale | expense      │       │ product_id (no FK)            │  │
//! │  │ note / total              │       │ product_name / qty /          │  │
//! │  │ created_at / recorded_by  │       │ unit_price (snapshots)        │  │
//! │  └───────────────────────────┘       └───────────────────────────────┘  │
//! │                                                                         │
//! │  Reads: created_at DESC, then seq DESC (newest first)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use warung_core::validation::validate_expense;
use warung_core::{CartLine, NewExpense, Session, Transaction, TransactionKind};

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    kind: String,
    note: Option<String>,
    total: i64,
    created_at: DateTime<Utc>,
    recorded_by: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    transaction_id: String,
    product_id: String,
    product_name: String,
    qty: i64,
    unit_price: i64,
}

impl ItemRow {
    fn into_line(self) -> CartLine {
        CartLine {
            product_id: self.product_id,
            product_name: self.product_name,
            qty: self.qty,
            unit_price: self.unit_price,
        }
    }
}

impl TransactionRow {
    fn into_transaction(self, items: Vec<CartLine>) -> DbResult<Transaction> {
        let kind: TransactionKind = self
            .kind
            .parse()
            .map_err(|e: warung_core::ValidationError| {
                DbError::corrupt("Transaction", &self.id, e.to_string())
            })?;

        Ok(Transaction {
            id: self.id,
            kind,
            items,
            note: self.note,
            total: self.total,
            created_at: self.created_at,
            recorded_by: self.recorded_by,
        })
    }
}

/// Appends a transaction and its line snapshots on the connection of an
/// open unit. Nothing is committed here.
pub async fn append_transaction(conn: &mut SqliteConnection, record: &Transaction) -> DbResult<()> {
    debug!(id = %record.id, kind = %record.kind, items = record.items.len(), "Appending transaction");

    sqlx::query(
        r#"
        INSERT INTO transactions (id, kind, note, total, created_at, recorded_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&record.id)
    .bind(record.kind)
    .bind(&record.note)
    .bind(record.total)
    .bind(record.created_at)
    .bind(&record.recorded_by)
    .execute(&mut *conn)
    .await?;

    for (position, line) in record.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO transaction_items (
                transaction_id, position, product_id, product_name, qty, unit_price
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&record.id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.qty)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Repository for ledger reads and expense writes.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Records money spent.
    ///
    /// ## What This Does
    /// 1. Validates note (required) and amount (> 0)
    /// 2. Appends one `expense` transaction dated `occurred_at`
    ///
    /// Unconditional: no stock is read or written.
    pub async fn record_expense(&self, session: &Session, input: &NewExpense) -> DbResult<Transaction> {
        let input = validate_expense(input)?;

        let record = Transaction {
            id: Uuid::new_v4().to_string(),
            kind: TransactionKind::Expense,
            items: Vec::new(),
            note: Some(input.note),
            total: input.amount,
            created_at: input.occurred_at,
            recorded_by: session.user_id.clone(),
        };

        let mut tx = self.pool.begin().await?;
        append_transaction(&mut tx, &record).await?;
        tx.commit().await?;

        info!(id = %record.id, total = record.total, user = %session.user_id, "Expense recorded");
        Ok(record)
    }

    /// All transactions, newest first.
    pub async fn list(&self) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, kind, note, total, created_at, recorded_by
            FROM transactions
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT transaction_id, product_id, product_name, qty, unit_price
            FROM transaction_items
            ORDER BY transaction_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_transaction: HashMap<String, Vec<CartLine>> = HashMap::new();
        for item in items {
            by_transaction
                .entry(item.transaction_id.clone())
                .or_default()
                .push(item.into_line());
        }

        let transactions = rows
            .into_iter()
            .map(|row| {
                let lines = by_transaction.remove(&row.id).unwrap_or_default();
                row.into_transaction(lines)
            })
            .collect::<DbResult<Vec<_>>>()?;

        debug!(count = transactions.len(), "Listed transactions");
        Ok(transactions)
    }

    /// Gets a transaction with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, kind, note, total, created_at, recorded_by
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT transaction_id, product_id, product_name, qty, unit_price
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let lines = items.into_iter().map(ItemRow::into_line).collect();
        row.into_transaction(lines).map(Some)
    }

    /// Number of ledger entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
