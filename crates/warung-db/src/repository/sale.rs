//! # Sale Executor
//!
//! Turns a cart into stock decrements plus one `sale` ledger entry, all or
//! nothing.
//!
//! ## One Attempt
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├── recompute Σ qty × unit_price ──► ≠ submitted? TotalMismatch      │
//! │    │                                                                    │
//! │    ├── for each distinct product (summed qty):                          │
//! │    │     read_product ──► missing? ProductNotFound                      │
//! │    │     stock < qty  ──► InsufficientStock                             │
//! │    │                                                                    │
//! │    ├── for each distinct product:                                       │
//! │    │     write_product_stock(stock - qty, expected version)             │
//! │    │                                                                    │
//! │    ├── append_transaction(sale, items in caller order, now)             │
//! │    │                                                                    │
//! │  COMMIT ─────────────────────────────────────────────────► Transaction  │
//! │                                                                         │
//! │  Any error drops the open transaction, which rolls it back.             │
//! │  Conflict ──► whole attempt re-run by retry_on_conflict                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::{read_product, write_product_stock};
use crate::repository::transaction::append_transaction;
use crate::retry::{retry_on_conflict, RetryPolicy};
use warung_core::validation::{validate_cart_size, validate_quantity};
use warung_core::{CartLine, CoreError, Money, Session, Transaction, TransactionKind};

/// Quantity wanted from one product across all of a cart's lines.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Demand {
    product_id: String,
    product_name: String,
    qty: i64,
}

/// Merges lines by product, keeping first-seen order.
fn merge_demand(items: &[CartLine]) -> Vec<Demand> {
    let mut demand: Vec<Demand> = Vec::with_capacity(items.len());

    for line in items {
        match demand.iter_mut().find(|d| d.product_id == line.product_id) {
            Some(d) => d.qty += line.qty,
            None => demand.push(Demand {
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                qty: line.qty,
            }),
        }
    }

    demand
}

/// `Σ qty × unit_price`, refusing totals that do not fit.
fn compute_total(items: &[CartLine]) -> DbResult<i64> {
    items
        .iter()
        .try_fold(Money::zero(), |acc, line| {
            Money::from_units(line.unit_price)
                .checked_multiply_quantity(line.qty)
                .and_then(|line_total| acc.checked_add(line_total))
        })
        .map(|m| m.units())
        .ok_or_else(|| {
            DbError::from(warung_core::ValidationError::OutOfRange {
                field: "total".to_string(),
                min: 0,
                max: i64::MAX,
            })
        })
}

/// Executes sales against live stock.
///
/// ## Usage
/// ```rust,ignore
/// let sale = db.sales().execute(&session, cart.lines(), cart.total().units()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleExecutor {
    pool: SqlitePool,
    policy: RetryPolicy,
}

impl SaleExecutor {
    /// Creates a new SaleExecutor.
    pub fn new(pool: SqlitePool, policy: RetryPolicy) -> Self {
        SaleExecutor { pool, policy }
    }

    /// Sells `items` for `total`, recorded under `session`.
    ///
    /// ## Returns
    /// * `Ok(Transaction)` - Stock decremented and the sale recorded
    /// * `Err(DbError::Domain(EmptyCart | TotalMismatch | ProductNotFound | InsufficientStock | ..))`
    ///   - Nothing was written
    /// * `Err(DbError::RetriesExhausted)` - Concurrent writers kept winning
    pub async fn execute(
        &self,
        session: &Session,
        items: &[CartLine],
        total: i64,
    ) -> DbResult<Transaction> {
        if items.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        validate_cart_size(items.len())?;
        for line in items {
            validate_quantity(line.qty)?;
        }

        let demand = merge_demand(items);

        debug!(
            lines = items.len(),
            products = demand.len(),
            total,
            user = %session.user_id,
            "Executing sale"
        );

        let sale = retry_on_conflict(&self.policy, "sale", |attempt| {
            self.attempt(attempt, session, items, &demand, total)
        })
        .await?;

        info!(id = %sale.id, total = sale.total, lines = sale.items.len(), "Sale committed");
        Ok(sale)
    }

    async fn attempt(
        &self,
        attempt: u32,
        session: &Session,
        items: &[CartLine],
        demand: &[Demand],
        total: i64,
    ) -> DbResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let computed = compute_total(items)?;
        if computed != total {
            return Err(CoreError::TotalMismatch {
                submitted: total,
                computed,
            }
            .into());
        }

        let mut planned = Vec::with_capacity(demand.len());
        for wanted in demand {
            let product = read_product(&mut tx, &wanted.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound {
                    product_id: wanted.product_id.clone(),
                    product_name: wanted.product_name.clone(),
                })?;

            if !product.can_sell(wanted.qty) {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id,
                    product_name: product.name,
                    available: product.stock,
                    requested: wanted.qty,
                }
                .into());
            }

            planned.push((product, wanted.qty));
        }

        for (product, qty) in &planned {
            write_product_stock(&mut tx, &product.id, product.stock - qty, product.version).await?;
        }

        let record = Transaction {
            id: Uuid::new_v4().to_string(),
            kind: TransactionKind::Sale,
            items: items.to_vec(),
            note: None,
            total,
            created_at: Utc::now(),
            recorded_by: session.user_id.clone(),
        };
        append_transaction(&mut tx, &record).await?;

        tx.commit().await?;

        debug!(id = %record.id, attempt, "Sale attempt committed");
        Ok(record)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use std::time::Duration;
    use warung_core::{Cart, NewProduct, Product};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn stock_product(db: &Database, name: &str, stock: i64, price: i64) -> Product {
        db.products()
            .insert(&NewProduct {
                name: name.to_string(),
                stock,
                price,
                category: Some("Pempek".to_string()),
                image_url: None,
            })
            .await
            .unwrap()
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_sale_applies_all_lines() {
        let db = test_db().await;
        let lenjer = stock_product(&db, "Lenjer", 10, 8_000).await;
        let adaan = stock_product(&db, "Adaan", 6, 5_000).await;
        let session = Session::new("kasir-1");

        let mut cart = Cart::new();
        cart.add_quantity(&lenjer, 3).unwrap();
        cart.add_quantity(&adaan, 6).unwrap();

        let sale = db
            .sales()
            .execute(&session, cart.lines(), cart.total().units())
            .await
            .unwrap();

        assert_eq!(sale.kind, TransactionKind::Sale);
        assert_eq!(sale.total, 54_000);
        assert_eq!(sale.items, cart.lines().to_vec());
        assert_eq!(sale.recorded_by, "kasir-1");

        assert_eq!(stock_of(&db, &lenjer.id).await, 7);
        assert_eq!(stock_of(&db, &adaan.id).await, 0);

        let ledger = db.transactions().list().await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0], sale);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = test_db().await;
        let lenjer = stock_product(&db, "Lenjer", 10, 8_000).await;
        let kapal = stock_product(&db, "Kapal Selam", 2, 15_000).await;

        let items = vec![
            CartLine::from_product(&lenjer, 4),
            CartLine::from_product(&kapal, 3),
        ];
        let err = db
            .sales()
            .execute(&Session::new("owner"), &items, 4 * 8_000 + 3 * 15_000)
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_name, "Kapal Selam");
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(stock_of(&db, &lenjer.id).await, 10);
        assert_eq!(stock_of(&db, &kapal.id).await, 2);
        assert_eq!(db.transactions().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_checked_together() {
        let db = test_db().await;
        let adaan = stock_product(&db, "Adaan", 5, 5_000).await;

        let items = vec![
            CartLine::from_product(&adaan, 3),
            CartLine::from_product(&adaan, 3),
        ];
        let err = db
            .sales()
            .execute(&Session::new("owner"), &items, 30_000)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { requested: 6, available: 5, .. })
        ));
        assert_eq!(stock_of(&db, &adaan.id).await, 5);

        let items = vec![
            CartLine::from_product(&adaan, 2),
            CartLine::from_product(&adaan, 3),
        ];
        let sale = db
            .sales()
            .execute(&Session::new("owner"), &items, 25_000)
            .await
            .unwrap();
        assert_eq!(sale.items.len(), 2);
        assert_eq!(stock_of(&db, &adaan.id).await, 0);
    }

    #[tokio::test]
    async fn test_missing_product_is_named() {
        let db = test_db().await;
        let lenjer = stock_product(&db, "Lenjer", 10, 8_000).await;
        let ghost = CartLine {
            product_id: "deleted-id".to_string(),
            product_name: "Pempek Telur".to_string(),
            qty: 1,
            unit_price: 12_000,
        };

        let items = vec![CartLine::from_product(&lenjer, 1), ghost];
        let err = db
            .sales()
            .execute(&Session::new("owner"), &items, 20_000)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::ProductNotFound { ref product_name, .. })
                if product_name == "Pempek Telur"
        ));
        assert_eq!(stock_of(&db, &lenjer.id).await, 10);
    }

    #[tokio::test]
    async fn test_total_mismatch_writes_nothing() {
        let db = test_db().await;
        let lenjer = stock_product(&db, "Lenjer", 10, 8_000).await;

        let items = vec![CartLine::from_product(&lenjer, 2)];
        let err = db
            .sales()
            .execute(&Session::new("owner"), &items, 15_000)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::TotalMismatch { submitted: 15_000, computed: 16_000 })
        ));
        assert_eq!(stock_of(&db, &lenjer.id).await, 10);
        assert_eq!(db.transactions().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_and_invalid_carts_are_rejected() {
        let db = test_db().await;
        let session = Session::new("owner");

        let err = db.sales().execute(&session, &[], 0).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));

        let lenjer = stock_product(&db, "Lenjer", 10, 8_000).await;
        let mut line = CartLine::from_product(&lenjer, 1);
        line.qty = 0;
        let err = db.sales().execute(&session, &[line], 0).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_snapshot_survives_price_change_and_delete() {
        let db = test_db().await;
        let lenjer = stock_product(&db, "Lenjer", 10, 8_000).await;

        let items = vec![CartLine::from_product(&lenjer, 1)];
        let sale = db
            .sales()
            .execute(&Session::new("owner"), &items, 8_000)
            .await
            .unwrap();

        db.products().delete(&lenjer.id).await.unwrap();

        let stored = db.transactions().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].product_name, "Lenjer");
        assert_eq!(stored.items[0].unit_price, 8_000);
    }

    #[tokio::test]
    async fn test_concurrent_sales_on_single_connection() {
        let db = test_db().await;
        let kapal = stock_product(&db, "Kapal Selam", 5, 15_000).await;
        let items = vec![CartLine::from_product(&kapal, 3)];

        let (first, second) = (db.sales(), db.sales());
        let (kasir_1, kasir_2) = (Session::new("kasir-1"), Session::new("kasir-2"));
        let (a, b) = tokio::join!(
            first.execute(&kasir_1, &items, 45_000),
            second.execute(&kasir_2, &items, 45_000),
        );

        assert_race_outcome(&db, &kapal.id, a, b).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sales_on_shared_file() {
        let path = std::env::temp_dir().join(format!("warung-race-{}.db", Uuid::new_v4()));
        let policy = RetryPolicy::new(10).backoff(Duration::from_millis(5), Duration::from_millis(50));
        let config = DbConfig::new(&path)
            .max_connections(4)
            .busy_timeout(Duration::from_millis(100))
            .sale_retry(policy);
        let db = Database::new(config).await.unwrap();

        let kapal = stock_product(&db, "Kapal Selam", 5, 15_000).await;
        let items = vec![CartLine::from_product(&kapal, 3)];

        let (a, b) = {
            let (db_a, db_b) = (db.clone(), db.clone());
            let (items_a, items_b) = (items.clone(), items.clone());
            let task_a = tokio::spawn(async move {
                db_a.sales().execute(&Session::new("kasir-1"), &items_a, 45_000).await
            });
            let task_b = tokio::spawn(async move {
                db_b.sales().execute(&Session::new("kasir-2"), &items_b, 45_000).await
            });
            (task_a.await.unwrap(), task_b.await.unwrap())
        };

        assert_race_outcome(&db, &kapal.id, a, b).await;

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    async fn assert_race_outcome(
        db: &Database,
        product_id: &str,
        a: DbResult<Transaction>,
        b: DbResult<Transaction>,
    ) {
        let (ok, err) = match (a, b) {
            (Ok(t), Err(e)) | (Err(e), Ok(t)) => (t, e),
            (a, b) => panic!("expected exactly one success, got {a:?} and {b:?}"),
        };

        assert_eq!(ok.total, 45_000);
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));
        assert_eq!(stock_of(db, product_id).await, 2);
        assert_eq!(db.transactions().count().await.unwrap(), 1);
    }

    #[test]
    fn test_merge_demand_keeps_first_seen_order() {
        let line = |id: &str, qty| CartLine {
            product_id: id.to_string(),
            product_name: id.to_uppercase(),
            qty,
            unit_price: 1_000,
        };
        let merged = merge_demand(&[line("b", 1), line("a", 2), line("b", 4)]);

        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].product_id.as_str(), merged[0].qty), ("b", 5));
        assert_eq!((merged[1].product_id.as_str(), merged[1].qty), ("a", 2));
    }

    #[test]
    fn test_compute_total_overflow() {
        let line = CartLine {
            product_id: "x".to_string(),
            product_name: "X".to_string(),
            qty: 2,
            unit_price: i64::MAX,
        };
        assert!(compute_total(&[line]).is_err());
    }
}
