//! # Cart & Totals
//!
//! The cart is an explicit value carried by the caller; nothing here is
//! global or shared. Totals are recomputed from the lines every time.
//!
//! ## Totals Arithmetic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► subtotal = Σ unit_price × quantity                          │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │            total = max(subtotal − discount + tax, 0)                    │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  payment ──► change = payment − total      (payment ≥ total)           │
//! │                 └──► InsufficientPayment   (payment < total)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cart Operations
//! ```text
//! Scan product ──────► add_item()        ──► line.quantity += n (stock re-checked)
//! Change quantity ───► update_quantity() ──► line.quantity  = n (stock re-checked)
//! Remove ────────────► remove_item()     ──► line dropped
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError, ValidationErrors};
use crate::money::Money;
use crate::types::{Product, TaxRate};
use crate::validation::{
    can_add_to_cart, ensure_payment, validate_cart_size, validate_money, validate_quantity,
};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Totals Calculator
// =============================================================================

/// The price-relevant part of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub unit_price: Money,
    pub quantity: i64,
}

impl LineItem {
    pub fn new(unit_price: Money, quantity: i64) -> Self {
        LineItem {
            unit_price,
            quantity,
        }
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Computed figures for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

/// Computes subtotal and total for a set of lines.
///
/// ## Rules
/// - Every quantity must be positive
/// - `discount` and `tax` must not be negative
/// - `total = max(subtotal − discount + tax, 0)`
///
/// All failing fields are reported together.
///
/// ## Example
/// ```rust
/// use koperasi_core::cart::{compute_totals, LineItem};
/// use koperasi_core::money::Money;
///
/// let lines = [LineItem::new(Money::from_rupiah(10_000), 2)];
/// let totals = compute_totals(&lines, Money::from_rupiah(25_000), Money::zero()).unwrap();
/// assert_eq!(totals.subtotal.rupiah(), 20_000);
/// assert_eq!(totals.total, Money::zero());
/// ```
pub fn compute_totals(lines: &[LineItem], discount: Money, tax: Money) -> CoreResult<CartTotals> {
    let mut errors = ValidationErrors::new();
    for (index, line) in lines.iter().enumerate() {
        if let Err(err) = validate_quantity(line.quantity) {
            errors.push(with_line_field(err, index));
        }
        errors.check(validate_money(
            &format!("items[{}].unitPrice", index),
            line.unit_price.rupiah(),
        ));
    }
    errors.check(validate_cart_size(lines.len()));
    errors.check(validate_money("discount", discount.rupiah()));
    errors.check(validate_money("tax", tax.rupiah()));
    errors.into_result()?;

    let subtotal: Money = lines.iter().map(LineItem::subtotal).sum();
    let total = (subtotal - discount + tax).non_negative();

    Ok(CartTotals {
        item_count: lines.len(),
        total_quantity: lines.iter().map(|l| l.quantity).sum(),
        subtotal,
        discount,
        tax,
        total,
    })
}

/// Change owed for `payment` against `total`.
///
/// Never negative: a payment below the total fails with
/// `InsufficientPayment`.
pub fn compute_change(total: Money, payment: Money) -> CoreResult<Money> {
    ensure_payment(total, payment)?;
    Ok(payment - total)
}

/// Tax applied when the caller does not supply one: the configured rate on
/// the discounted subtotal.
pub fn default_tax(subtotal: Money, discount: Money, rate: TaxRate) -> Money {
    (subtotal - discount).non_negative().calculate_tax(rate)
}

fn with_line_field(err: ValidationError, index: usize) -> ValidationError {
    let field = format!("items[{}].quantity", index);
    match err {
        ValidationError::MustBePositive { .. } => ValidationError::MustBePositive { field },
        ValidationError::OutOfRange { min, max, .. } => {
            ValidationError::OutOfRange { field, min, max }
        }
        other => other,
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A cart line with the product data frozen at the time it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl CartLine {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price: product.selling_price(),
            quantity,
        }
    }

    pub fn line_item(&self) -> LineItem {
        LineItem::new(self.unit_price, self.quantity)
    }
}

/// A POS cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding again raises the quantity)
/// - Every quantity is positive and within the product's stock at the time
///   of the last change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Quantity of `product_id` currently in the cart.
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    /// Adds `quantity` of a product, merging with an existing line.
    ///
    /// Fails with `InsufficientStock` when the combined quantity would exceed
    /// `product.stock`.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        let in_cart = self.quantity_of(&product.id);
        if !product.is_active || !can_add_to_cart(quantity, in_cart, product.stock) {
            return Err(CoreError::InsufficientStock {
                sku: product.sku.clone(),
                available: if product.is_active { product.stock } else { 0 },
                requested: in_cart + quantity,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            validate_quantity(line.quantity + quantity)?;
            line.quantity += quantity;
            return Ok(());
        }

        validate_cart_size(self.lines.len() + 1)?;
        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Sets a line's quantity, re-validated against the latest `available`
    /// stock. A quantity of zero removes the line.
    pub fn update_quantity(
        &mut self,
        product_id: &str,
        quantity: i64,
        available: i64,
    ) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::not_found("Cart line", product_id))?;

        if !can_add_to_cart(quantity, 0, available) {
            return Err(CoreError::InsufficientStock {
                sku: line.sku.clone(),
                available,
                requested: quantity,
            });
        }

        line.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() == before {
            return Err(CoreError::not_found("Cart line", product_id));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn line_items(&self) -> Vec<LineItem> {
        self.lines.iter().map(CartLine::line_item).collect()
    }

    pub fn totals(&self, discount: Money, tax: Money) -> CoreResult<CartTotals> {
        compute_totals(&self.line_items(), discount, tax)
    }

    /// Lines still free to grow before the distinct-line limit.
    pub fn remaining_capacity(&self) -> usize {
        MAX_CART_ITEMS.saturating_sub(self.lines.len())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
