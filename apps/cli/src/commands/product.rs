//! # Product Commands
//!
//! Catalogue listing and maintenance.
//!
//! ```text
//! products [--category C] ──► ProductRepository::list / list_by_category
//! categories              ──► report::categories(list)
//! add-product             ──► ProductRepository::insert
//! edit-product <id>       ──► get_by_id, overlay given fields, update
//! delete-product <id>     ──► get_by_id, delete (history keeps snapshots)
//! ```

use serde::Serialize;
use tracing::{debug, info};

use super::{Context, Render};
use crate::cli::ProductFields;
use crate::error::{CliError, CliResult};
use warung_core::{report, Money, NewProduct, Product};

/// Product as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub stock: i64,
    pub price: i64,
    pub category: String,
    pub image_url: Option<String>,
    pub version: i64,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        ProductDto {
            id: p.id,
            name: p.name,
            stock: p.stock,
            price: p.price,
            category: p.category,
            image_url: p.image_url,
            version: p.version,
        }
    }
}

impl Render for ProductDto {
    fn render(&self) -> String {
        let mut out = format!(
            "{}\n  id:       {}\n  category: {}\n  stock:    {}\n  price:    {}",
            self.name,
            self.id,
            self.category,
            self.stock,
            Money::from_units(self.price)
        );
        if let Some(url) = &self.image_url {
            out.push_str(&format!("\n  image:    {}", url));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ProductList(pub Vec<ProductDto>);

impl Render for ProductList {
    fn render(&self) -> String {
        if self.0.is_empty() {
            return "No products.".to_string();
        }

        let mut out = format!(
            "{:<36}  {:<28}  {:<14}  {:>6}  {:>12}",
            "ID", "NAME", "CATEGORY", "STOCK", "PRICE"
        );
        for p in &self.0 {
            out.push_str(&format!(
                "\n{:<36}  {:<28}  {:<14}  {:>6}  {:>12}",
                p.id,
                p.name,
                p.category,
                p.stock,
                Money::from_units(p.price).to_string()
            ));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CategoryList(pub Vec<String>);

impl Render for CategoryList {
    fn render(&self) -> String {
        if self.0.is_empty() {
            return "No categories.".to_string();
        }
        self.0.join("\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    pub id: String,
    pub name: String,
}

impl Render for Deleted {
    fn render(&self) -> String {
        format!("Deleted {} ({})", self.name, self.id)
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Lists the catalogue by name, optionally narrowed to one category.
///
/// The category is normalized the same way as on save, so `--category ""`
/// lists the uncategorized products.
pub async fn list_products(ctx: &Context, category: Option<&str>) -> CliResult<ProductList> {
    debug!(category = ?category, "list_products command");

    let products = match category {
        Some(category) => ctx.db.products().list_by_category(category).await?,
        None => ctx.db.products().list().await?,
    };

    Ok(ProductList(products.into_iter().map(ProductDto::from).collect()))
}

pub async fn list_categories(ctx: &Context) -> CliResult<CategoryList> {
    let products = ctx.db.products().list().await?;
    Ok(CategoryList(report::categories(&products)))
}

pub async fn add_product(ctx: &Context, fields: ProductFields) -> CliResult<ProductDto> {
    let input = NewProduct {
        name: fields
            .name
            .ok_or_else(|| CliError::validation("name is required"))?,
        stock: fields
            .stock
            .ok_or_else(|| CliError::validation("stock is required"))?,
        price: fields
            .price
            .ok_or_else(|| CliError::validation("price is required"))?,
        category: fields.category,
        image_url: fields.image_url,
    };

    let product = ctx.db.products().insert(&input).await?;
    info!(id = %product.id, name = %product.name, "Product added");

    Ok(product.into())
}

/// Changes only the fields given; the rest keep their stored values.
pub async fn edit_product(ctx: &Context, id: &str, fields: ProductFields) -> CliResult<ProductDto> {
    let existing = ctx
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| CliError::not_found("Product", id))?;

    let input = NewProduct {
        name: fields.name.unwrap_or(existing.name),
        stock: fields.stock.unwrap_or(existing.stock),
        price: fields.price.unwrap_or(existing.price),
        category: Some(fields.category.unwrap_or(existing.category)),
        image_url: fields.image_url.or(existing.image_url),
    };

    let product = ctx.db.products().update(id, &input).await?;
    info!(id = %product.id, version = product.version, "Product updated");

    Ok(product.into())
}

pub async fn delete_product(ctx: &Context, id: &str) -> CliResult<Deleted> {
    let existing = ctx
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| CliError::not_found("Product", id))?;

    ctx.db.products().delete(id).await?;
    info!(id = %id, "Product deleted");

    Ok(Deleted {
        id: existing.id,
        name: existing.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, product};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_list_by_category_normalizes_blank() {
        let ctx = context().await;
        product(&ctx, "Pempek Lenjer", 10, 8_000, "Pempek").await;
        product(&ctx, "Kerupuk", 0, 20_000, "   ").await;

        let uncategorized = list_products(&ctx, Some("")).await.unwrap();
        assert_eq!(uncategorized.0.len(), 1);
        assert_eq!(uncategorized.0[0].category, "Uncategorized");

        let categories = list_categories(&ctx).await.unwrap();
        assert_eq!(categories.0, vec!["Pempek", "Uncategorized"]);
    }

    #[tokio::test]
    async fn test_add_product_validates() {
        let ctx = context().await;
        let err = add_product(
            &ctx,
            ProductFields {
                name: Some("Tekwan".to_string()),
                stock: Some(5),
                price: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(list_products(&ctx, None).await.unwrap().0.is_empty());
    }

    #[tokio::test]
    async fn test_add_product_rejects_price_and_stock_past_limits() {
        let ctx = context().await;
        let huge = |price, stock| ProductFields {
            name: Some("Kapal Selam".to_string()),
            stock: Some(stock),
            price: Some(price),
            ..Default::default()
        };

        let err = add_product(&ctx, huge(i64::MAX / 2, 10)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        let err = add_product(&ctx, huge(3, i64::MAX / 2)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        add_product(&ctx, huge(warung_core::MAX_PRICE, warung_core::MAX_STOCK))
            .await
            .unwrap();
        let summary = crate::commands::report::stock_report(&ctx, None).await.unwrap();
        assert_eq!(
            summary.inventory_value.units(),
            warung_core::MAX_PRICE * warung_core::MAX_STOCK
        );
    }

    #[tokio::test]
    async fn test_edit_keeps_unspecified_fields() {
        let ctx = context().await;
        let lenjer = product(&ctx, "Pempek Lenjer", 10, 8_000, "Pempek").await;

        let edited = edit_product(
            &ctx,
            &lenjer.id,
            ProductFields {
                price: Some(9_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(edited.name, "Pempek Lenjer");
        assert_eq!(edited.stock, 10);
        assert_eq!(edited.price, 9_000);
        assert_eq!(edited.category, "Pempek");
        assert_eq!(edited.version, lenjer.version + 1);
    }

    #[tokio::test]
    async fn test_edit_and_delete_missing_product() {
        let ctx = context().await;

        let err = edit_product(&ctx, "nope", ProductFields::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = delete_product(&ctx, "nope").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_delete_product() {
        let ctx = context().await;
        let tekwan = product(&ctx, "Tekwan", 10, 15_000, "Kuah").await;

        let deleted = delete_product(&ctx, &tekwan.id).await.unwrap();
        assert_eq!(deleted.render(), format!("Deleted Tekwan ({})", tekwan.id));
        assert!(ctx.db.products().get_by_id(&tekwan.id).await.unwrap().is_none());
    }
}
