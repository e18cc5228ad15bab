//! # Product Repository
//!
//! Database operations for the catalogue.
//!
//! ## Key Operations
//! - CRUD operations (hard delete)
//! - Unit-scoped reads and versioned stock writes for the sale executor
//!
//! ## Read Normalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Every product read passes through here                  │
//! │                                                                         │
//! │  SQLite row ──► ProductRow (lenient decode) ──► into_product()         │
//! │                                                                         │
//! │   name     NULL / blank / not text      ──►  "Unnamed"                  │
//! │   stock    NULL / not an integer        ──►  0                          │
//! │   price    NULL / not an integer        ──►  0                          │
//! │   category NULL / blank                 ──►  "Uncategorized"            │
//! │   image    NULL / blank                 ──►  None                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use warung_core::report::filter_by_category;
use warung_core::validation::{normalize_category, normalize_image_url, validate_new_product};
use warung_core::{NewProduct, Product, UNNAMED_PRODUCT};

const PRODUCT_COLUMNS: &str =
    "id, name, stock, price, category, image_url, created_at, updated_at, version";

// =============================================================================
// Row Mapping
// =============================================================================

/// A product row exactly as stored, before normalization.
#[derive(Debug)]
struct ProductRow {
    id: String,
    name: Option<String>,
    stock: Option<i64>,
    price: Option<i64>,
    category: Option<String>,
    image_url: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: i64,
}

/// Decodes a column, treating NULL and wrong-typed values alike as absent.
fn lenient<'r, T>(row: &'r SqliteRow, column: &str) -> Option<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get::<Option<T>, _>(column).ok().flatten()
}

impl<'r> FromRow<'r, SqliteRow> for ProductRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: lenient(row, "name"),
            stock: lenient(row, "stock"),
            price: lenient(row, "price"),
            category: lenient(row, "category"),
            image_url: lenient(row, "image_url"),
            created_at: lenient(row, "created_at"),
            updated_at: lenient(row, "updated_at"),
            version: lenient(row, "version").unwrap_or(0),
        })
    }
}

impl ProductRow {
    fn into_product(self) -> Product {
        let name = match self.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => UNNAMED_PRODUCT.to_string(),
        };

        let created_at = self.created_at.unwrap_or_default();

        Product {
            id: self.id,
            name,
            stock: self.stock.unwrap_or(0).max(0),
            price: self.price.unwrap_or(0).max(0),
            category: normalize_category(self.category.as_deref()),
            image_url: normalize_image_url(self.image_url.as_deref()),
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
            version: self.version,
        }
    }
}

// =============================================================================
// Unit-Scoped Operations
// =============================================================================

/// Reads one product on the connection of an open unit.
pub async fn read_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let row: Option<ProductRow> =
        sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(row.map(ProductRow::into_product))
}

/// Sets a product's stock, provided nobody changed the row since it was read.
///
/// ## Returns
/// * `Ok(())` - Stock written, version bumped
/// * `Err(DbError::Conflict)` - `expected_version` is stale (or the row vanished)
pub async fn write_product_stock(
    conn: &mut SqliteConnection,
    id: &str,
    new_stock: i64,
    expected_version: i64,
) -> DbResult<()> {
    debug!(id = %id, new_stock, expected_version, "Writing product stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = ?2, updated_at = ?3, version = version + 1
        WHERE id = ?1 AND version = ?4
        "#,
    )
    .bind(id)
    .bind(new_stock)
    .bind(Utc::now())
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Conflict(format!(
            "product {} changed since version {}",
            id, expected_version
        )));
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let all = repo.list().await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name COLLATE NOCASE, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let products: Vec<Product> = rows.into_iter().map(ProductRow::into_product).collect();
        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Products that can be sold right now (stock > 0).
    pub async fn list_in_stock(&self) -> DbResult<Vec<Product>> {
        let mut products = self.list().await?;
        products.retain(|p| p.stock > 0);
        Ok(products)
    }

    /// Products in a category, compared after normalization.
    pub async fn list_by_category(&self, category: &str) -> DbResult<Vec<Product>> {
        let products = self.list().await?;
        Ok(filter_by_category(&products, category)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        read_product(&mut conn, id).await
    }

    /// Validates and inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Stored product with generated id and timestamps
    /// * `Err(DbError::Domain)` - Input failed validation
    pub async fn insert(&self, input: &NewProduct) -> DbResult<Product> {
        let input = validate_new_product(input)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, name = %input.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, stock, price, category, image_url,
                created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 0)
            "#,
        )
        .bind(&id)
        .bind(&input.name)
        .bind(input.stock)
        .bind(input.price)
        .bind(&input.category)
        .bind(&input.image_url)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &id))
    }

    /// Replaces a product's editable fields.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Product after the edit
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: &str, input: &NewProduct) -> DbResult<Product> {
        let input = validate_new_product(input)?;

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                stock = ?3,
                price = ?4,
                category = ?5,
                image_url = ?6,
                updated_at = ?7,
                version = version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.stock)
        .bind(input.price)
        .bind(&input.category)
        .bind(&input.image_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product permanently.
    ///
    /// Past sales keep their own name and price snapshots, so nothing in the
    /// ledger depends on the row.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products (for diagnostics and the seeder).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use warung_core::{CoreError, ValidationError, DEFAULT_CATEGORY};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_product(name: &str, stock: i64, price: i64, category: Option<&str>) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            stock,
            price,
            category: category.map(str::to_string),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo
            .insert(&new_product("  Pempek Lenjer ", 20, 8_000, Some("Pempek")))
            .await
            .unwrap();

        assert_eq!(created.name, "Pempek Lenjer");
        assert_eq!(created.version, 0);

        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blank_category_is_normalized() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo
            .insert(&new_product("Kerupuk", 5, 2_000, Some("   ")))
            .await
            .unwrap();
        assert_eq!(created.category, DEFAULT_CATEGORY);

        let listed = repo.list_by_category("").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_input() {
        let db = test_db().await;
        let err = db
            .products()
            .insert(&new_product("Tekwan", 5, 0, None))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.insert(&new_product("Adaan", 10, 5_000, None)).await.unwrap();
        let updated = repo
            .update(&created.id, &new_product("Pempek Adaan", 12, 5_500, Some("Pempek")))
            .await
            .unwrap();

        assert_eq!(updated.name, "Pempek Adaan");
        assert_eq!(updated.stock, 12);
        assert_eq!(updated.version, 1);

        let missing = repo.update("nope", &new_product("X", 1, 1, None)).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_is_permanent() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.insert(&new_product("Kulit", 3, 3_000, None)).await.unwrap();
        repo.delete(&created.id).await.unwrap();

        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
        assert!(matches!(repo.delete(&created.id).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_order_and_in_stock() {
        let db = test_db().await;
        let repo = db.products();

        repo.insert(&new_product("lenjer", 0, 8_000, None)).await.unwrap();
        repo.insert(&new_product("Adaan", 4, 5_000, None)).await.unwrap();
        repo.insert(&new_product("Kulit", 9, 3_000, None)).await.unwrap();

        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Adaan", "Kulit", "lenjer"]);

        let in_stock = repo.list_in_stock().await.unwrap();
        assert_eq!(in_stock.len(), 2);
        assert!(in_stock.iter().all(|p| p.stock > 0));
    }

    #[tokio::test]
    async fn test_malformed_rows_are_normalized() {
        let db = test_db().await;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, stock, price, category, image_url,
                                  created_at, updated_at, version)
            VALUES ('legacy', '   ', NULL, 'dua ribu', NULL, '', ?1, ?1, 3)
            "#,
        )
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        let product = db.products().get_by_id("legacy").await.unwrap().unwrap();
        assert_eq!(product.name, UNNAMED_PRODUCT);
        assert_eq!(product.stock, 0);
        assert_eq!(product.price, 0);
        assert_eq!(product.category, DEFAULT_CATEGORY);
        assert_eq!(product.image_url, None);
        assert_eq!(product.version, 3);
    }

    #[tokio::test]
    async fn test_stale_version_write_is_a_conflict() {
        let db = test_db().await;
        let created = db
            .products()
            .insert(&new_product("Lenjer", 10, 8_000, None))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        write_product_stock(&mut conn, &created.id, 7, 0).await.unwrap();

        let stale = write_product_stock(&mut conn, &created.id, 5, 0).await;
        assert!(matches!(stale, Err(DbError::Conflict(_))));

        let current = read_product(&mut conn, &created.id).await.unwrap().unwrap();
        assert_eq!(current.stock, 7);
        assert_eq!(current.version, 1);
    }
}
