//! # Validation Module
//!
//! Input rules for products, cart lines and expenses, plus the category
//! normalization shared by the create path and the list/filter path.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: CLI argument parsing (numbers parse, flags present)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (business rules, trimming, normalization)        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite (CHECK (stock >= 0), CHECK (qty >= 1), triggers)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewExpense, NewProduct};
use crate::{DEFAULT_CATEGORY, MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE, MAX_STOCK};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_NOTE_LEN: usize = 500;

// =============================================================================
// Normalization
// =============================================================================

/// Maps a raw category to its display label.
///
/// Blank or missing categories become [`DEFAULT_CATEGORY`]. Every place that
/// saves, lists or filters by category goes through here so the two paths
/// can never disagree.
///
/// ```rust
/// use warung_core::validation::normalize_category;
///
/// assert_eq!(normalize_category(Some("  ")), "Uncategorized");
/// assert_eq!(normalize_category(None), "Uncategorized");
/// assert_eq!(normalize_category(Some(" Pempek ")), "Pempek");
/// ```
pub fn normalize_category(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

/// Trims an image reference; blank means "no image".
pub fn normalize_image_url(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a product name and returns it trimmed.
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Stock may be zero but never negative, and at most [`MAX_STOCK`].
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }

    Ok(())
}

/// Prices are strictly positive whole units up to [`MAX_PRICE`].
pub fn validate_price(price: i64) -> ValidationResult<()> {
    if price <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    if price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 1,
            max: MAX_PRICE,
        });
    }

    Ok(())
}

/// Validates a line quantity (`1..=MAX_ITEM_QUANTITY`).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the number of lines in a cart about to be submitted.
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates product input and returns the normalized form to store.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<NewProduct> {
    let name = validate_product_name(&input.name)?;
    validate_stock(input.stock)?;
    validate_price(input.price)?;

    Ok(NewProduct {
        name,
        stock: input.stock,
        price: input.price,
        category: Some(normalize_category(input.category.as_deref())),
        image_url: normalize_image_url(input.image_url.as_deref()),
    })
}

/// Validates an expense and returns it with a trimmed note.
pub fn validate_expense(input: &NewExpense) -> ValidationResult<NewExpense> {
    let note = input.note.trim();

    if note.is_empty() {
        return Err(ValidationError::Required {
            field: "note".to_string(),
        });
    }

    if note.chars().count() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LEN,
        });
    }

    if input.amount <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(NewExpense {
        note: note.to_string(),
        amount: input.amount,
        occurred_at: input.occurred_at,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
