//! # Cart
//!
//! The sale in progress, built up one tap at a time before checkout.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Action                 Cart method             Change                  │
//! │  ──────                 ───────────             ──────                  │
//! │  Tap product ──────────► add(&product) ───────► qty + 1 (capped by      │
//! │                                                 the stock on screen)    │
//! │  Tap minus ────────────► remove_one(id) ──────► qty - 1, drop at 0      │
//! │  Checkout ─────────────► lines() + total() ───► sale executor           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock cap here only keeps the screen honest. The authoritative check
//! happens again against live stock inside the sale executor.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartLine, Product};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// An ordered list of cart lines, unique by product.
///
/// ## Invariants
/// - At most one line per `product_id`
/// - Every line has `qty >= 1`
/// - Lines keep the order in which products were first added
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds one unit of `product`.
    ///
    /// ## Errors
    /// - `InsufficientStock` if the cart would hold more than `product.stock`
    /// - `QuantityTooLarge` past [`MAX_ITEM_QUANTITY`]
    /// - `CartTooLarge` when a new line would exceed [`MAX_CART_ITEMS`]
    /// - `Validation(OutOfRange)` when the cart total would not fit in `i64`
    pub fn add(&mut self, product: &Product) -> CoreResult<()> {
        self.add_quantity(product, 1)
    }

    /// Adds `qty` units of `product`, merging with an existing line.
    pub fn add_quantity(&mut self, product: &Product, qty: i64) -> CoreResult<()> {
        crate::validation::validate_quantity(qty)?;

        let in_cart = self.quantity_of(&product.id);
        let wanted = in_cart + qty;

        if wanted > product.stock {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                available: product.stock,
                requested: wanted,
            });
        }

        if wanted > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: wanted,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let existing = self.lines.iter().position(|l| l.product_id == product.id);
        if existing.is_none() && self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let mut next = self.clone();
        match existing {
            Some(pos) => next.lines[pos].qty = wanted,
            None => next.lines.push(CartLine::from_product(product, qty)),
        }
        if next.checked_total().is_none() {
            return Err(ValidationError::OutOfRange {
                field: "total".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        *self = next;
        Ok(())
    }

    /// Takes one unit off a line, removing the line when it reaches zero.
    ///
    /// Returns `false` if the product was not in the cart.
    pub fn remove_one(&mut self, product_id: &str) -> bool {
        let Some(pos) = self.lines.iter().position(|l| l.product_id == product_id) else {
            return false;
        };

        if self.lines[pos].qty > 1 {
            self.lines[pos].qty -= 1;
        } else {
            self.lines.remove(pos);
        }
        true
    }

    /// Drops every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Quantity of a product currently in the cart (0 if absent).
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.qty)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consumes the cart, yielding lines in insertion order.
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Sum of `qty × unit_price` over all lines.
    ///
    /// `add_quantity` keeps this representable, so it never saturates for a
    /// cart built through it.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Exact total, `None` on overflow.
    pub fn checked_total(&self) -> Option<Money> {
        self.lines.iter().try_fold(Money::zero(), |acc, line| {
            Money::from_units(line.unit_price)
                .checked_multiply_quantity(line.qty)
                .and_then(|line_total| acc.checked_add(line_total))
        })
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.qty).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_product(id: &str, stock: i64, price: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Pempek {}", id),
            stock,
            price,
            category: "Pempek".to_string(),
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_add_same_product_increases_quantity() {
        let mut cart = Cart::new();
        let lenjer = test_product("lenjer", 10, 8_000);

        cart.add(&lenjer).unwrap();
        cart.add(&lenjer).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of("lenjer"), 2);
        assert_eq!(cart.total().units(), 16_000);
    }

    #[test]
    fn test_add_is_capped_by_stock() {
        let mut cart = Cart::new();
        let adaan = test_product("adaan", 2, 5_000);

        cart.add(&adaan).unwrap();
        cart.add(&adaan).unwrap();
        let err = cart.add(&adaan).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));
        assert_eq!(cart.quantity_of("adaan"), 2);
    }

    #[test]
    fn test_out_of_stock_product_cannot_be_added() {
        let mut cart = Cart::new();
        let habis = test_product("habis", 0, 5_000);
        assert!(cart.add(&habis).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_line_that_would_overflow_total_is_refused() {
        let mut cart = Cart::new();
        let mahal = test_product("mahal", 10, i64::MAX / 2);

        cart.add_quantity(&mahal, 1).unwrap();
        let err = cart.add_quantity(&mahal, 2).unwrap_err();

        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(cart.quantity_of("mahal"), 1);
        assert_eq!(cart.total().units(), i64::MAX / 2);

        let other = test_product("other", 10, i64::MAX / 2);
        assert!(cart.add_quantity(&other, 2).is_err());
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.checked_total(), Some(cart.total()));
    }

    #[test]
    fn test_remove_one() {
        let mut cart = Cart::new();
        let lenjer = test_product("lenjer", 10, 8_000);
        let kulit = test_product("kulit", 10, 3_000);

        cart.add_quantity(&lenjer, 2).unwrap();
        cart.add(&kulit).unwrap();

        assert!(cart.remove_one("lenjer"));
        assert_eq!(cart.quantity_of("lenjer"), 1);
        assert!(cart.remove_one("kulit"));
        assert_eq!(cart.len(), 1);
        assert!(!cart.remove_one("kulit"));
    }

    #[test]
    fn test_lines_keep_insertion_order_and_snapshot() {
        let mut cart = Cart::new();
        let mut lenjer = test_product("lenjer", 10, 8_000);
        let kulit = test_product("kulit", 10, 3_000);

        cart.add(&kulit).unwrap();
        cart.add(&lenjer).unwrap();
        lenjer.price = 9_000;
        cart.add(&lenjer).unwrap();

        let lines = cart.lines();
        assert_eq!(lines[0].product_id, "kulit");
        assert_eq!(lines[1].product_id, "lenjer");
        assert_eq!(lines[1].unit_price, 8_000);
        assert_eq!(cart.total().units(), 3_000 + 2 * 8_000);
        assert_eq!(cart.total_quantity(), 3);
    }
}
