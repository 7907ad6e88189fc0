//! # Checkout Workflow
//!
//! The order completion state machine. It decides *whether* a cart may be
//! turned into an order and *what* must be written; persisting the plan is
//! the database layer's job.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌─────────┐  begin_payment  ┌─────────────────┐  complete  ┌─────────┐│
//! │   │  DRAFT  │ ──────────────► │ PENDING_PAYMENT │ ─────────► │COMPLETED││
//! │   └────┬────┘                 └───┬─────────┬───┘            └─────────┘│
//! │        │                          │   ▲     │                           │
//! │        │ abort                    │   │fail │ abort                     │
//! │        │                          │   └─────┘                           │
//! │        ▼                          ▼                                     │
//! │   ┌─────────┐ ◄───────────────────┘                                     │
//! │   │ ABORTED │   nothing was persisted                                   │
//! │   └─────────┘                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Confirm
//! `confirm` runs in `PENDING_PAYMENT` and checks, in order:
//! 1. the cart is not empty
//! 2. every line's quantity is within its product's current stock
//! 3. the payment covers the total
//!
//! and yields a [`CheckoutPlan`] with prices snapshotted from the current
//! `selling_price` and the product versions the stock decrement must match.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{compute_change, compute_totals, default_tax, CartTotals, LineItem};
use crate::error::{CoreError, CoreResult, ValidationErrors};
use crate::money::Money;
use crate::types::{PaymentMethod, Product, TaxRate};
use crate::validation::{
    ensure_stock, validate_cart_size, validate_optional_text, validate_price, validate_quantity,
};

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "state")]
pub enum CheckoutState {
    Draft,
    PendingPayment,
    Completed {
        #[serde(rename = "orderId")]
        order_id: String,
    },
    Aborted,
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Draft => "DRAFT",
            CheckoutState::PendingPayment => "PENDING_PAYMENT",
            CheckoutState::Completed { .. } => "COMPLETED",
            CheckoutState::Aborted => "ABORTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Completed { .. } | CheckoutState::Aborted)
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Plan
// =============================================================================

/// A requested cart line: which product, how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
}

/// One validated line, priced at confirmation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlannedLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    /// Stock seen during validation.
    pub stock_before: i64,
    /// Product version seen during validation; the decrement only applies
    /// if the row still carries it.
    pub expected_version: i64,
}

/// Everything the atomic write group needs to persist an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    pub totals: CartTotals,
    pub payment_amount: Money,
    pub change: Money,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Receipt number for an order: `INV-YYYYMMDD-XXXXXX`.
///
/// The suffix is the first six hex digits of the order id, uppercased.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use koperasi_core::checkout::order_number;
///
/// let at = Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
/// assert_eq!(
///     order_number(at, "9f3c2a1b-0000-4000-8000-000000000000"),
///     "INV-20260309-9F3C2A"
/// );
/// ```
pub fn order_number(created_at: DateTime<Utc>, order_id: &str) -> String {
    let suffix: String = order_id
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .take(6)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("INV-{}-{}", created_at.format("%Y%m%d"), suffix)
}

// =============================================================================
// Session
// =============================================================================

/// One pass through the checkout workflow.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    items: Vec<CheckoutItem>,
    discount: Money,
    tax: Option<Money>,
    tax_rate: TaxRate,
    payment_method: PaymentMethod,
    notes: Option<String>,
    state: CheckoutState,
}

impl CheckoutSession {
    /// Starts a draft. Repeated product ids are merged into one line.
    ///
    /// When `tax` is `None` it is derived from `tax_rate` at confirmation.
    pub fn new(
        items: Vec<CheckoutItem>,
        discount: Money,
        tax: Option<Money>,
        tax_rate: TaxRate,
        payment_method: PaymentMethod,
        notes: Option<String>,
    ) -> Self {
        let mut merged: Vec<CheckoutItem> = Vec::with_capacity(items.len());
        for item in items {
            match merged.iter_mut().find(|m| m.product_id == item.product_id) {
                Some(existing) => existing.quantity += item.quantity,
                None => merged.push(item),
            }
        }

        CheckoutSession {
            items: merged,
            discount,
            tax,
            tax_rate,
            payment_method,
            notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            state: CheckoutState::Draft,
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn items(&self) -> &[CheckoutItem] {
        &self.items
    }

    /// Product ids the caller must load before `quote` / `confirm`.
    pub fn product_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.product_id.clone()).collect()
    }

    /// DRAFT → PENDING_PAYMENT. The cart must not be empty.
    pub fn begin_payment(&mut self) -> CoreResult<()> {
        self.expect_state(&[CheckoutState::Draft], "begin payment")?;
        if self.items.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        self.state = CheckoutState::PendingPayment;
        Ok(())
    }

    /// DRAFT | PENDING_PAYMENT → ABORTED. Nothing to clean up.
    pub fn abort(&mut self) -> CoreResult<()> {
        self.expect_state(
            &[CheckoutState::Draft, CheckoutState::PendingPayment],
            "abort",
        )?;
        self.state = CheckoutState::Aborted;
        Ok(())
    }

    /// Prices the cart against the current products without taking payment.
    ///
    /// Allowed in any non-terminal state; used for the live totals panel.
    pub fn quote(&self, products: &[Product]) -> CoreResult<(Vec<PlannedLine>, CartTotals)> {
        if self.state.is_terminal() {
            return Err(self.transition_error("quote"));
        }
        if self.items.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        validate_cart_size(self.items.len())?;

        let mut errors = ValidationErrors::new();
        errors.check(validate_optional_text("notes", self.notes.as_deref(), 500));
        errors.into_result()?;

        let mut lines = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let product = products
                .iter()
                .find(|p| p.id == item.product_id)
                .ok_or_else(|| CoreError::not_found("Product", &item.product_id))?;

            let available = if product.is_active { product.stock } else { 0 };
            ensure_stock(&product.sku, item.quantity, available)?;

            let unit_price = product.selling_price();
            validate_quantity(item.quantity)?;
            validate_price("sellingPrice", unit_price.rupiah())?;
            lines.push(PlannedLine {
                product_id: product.id.clone(),
                sku: product.sku.clone(),
                name: product.name.clone(),
                quantity: item.quantity,
                unit_price,
                subtotal: unit_price.multiply_quantity(item.quantity),
                stock_before: product.stock,
                expected_version: product.version,
            });
        }

        let line_items: Vec<LineItem> = lines
            .iter()
            .map(|l| LineItem::new(l.unit_price, l.quantity))
            .collect();
        let subtotal: Money = line_items.iter().map(LineItem::subtotal).sum();
        let tax = self
            .tax
            .unwrap_or_else(|| default_tax(subtotal, self.discount, self.tax_rate));
        let totals = compute_totals(&line_items, self.discount, tax)?;

        Ok((lines, totals))
    }

    /// Validates the cart against current stock and the tendered payment.
    ///
    /// Stays in PENDING_PAYMENT; call [`complete`](Self::complete) once the
    /// plan has been persisted.
    pub fn confirm(&self, payment: Money, products: &[Product]) -> CoreResult<CheckoutPlan> {
        self.expect_state(&[CheckoutState::PendingPayment], "confirm payment")?;

        let (lines, totals) = self.quote(products)?;
        let change = compute_change(totals.total, payment)?;

        Ok(CheckoutPlan {
            lines,
            totals,
            payment_amount: payment,
            change,
            payment_method: self.payment_method,
            notes: self.notes.clone(),
        })
    }

    /// PENDING_PAYMENT → COMPLETED once the order row exists.
    pub fn complete(&mut self, order_id: impl Into<String>) -> CoreResult<()> {
        self.expect_state(&[CheckoutState::PendingPayment], "complete")?;
        self.state = CheckoutState::Completed {
            order_id: order_id.into(),
        };
        Ok(())
    }

    /// Records a failed write group. The session stays in PENDING_PAYMENT so
    /// the cashier can resubmit.
    pub fn fail(&self, reason: impl Into<String>) -> CoreError {
        CoreError::order_failed(reason)
    }

    fn expect_state(&self, allowed: &[CheckoutState], action: &str) -> CoreResult<()> {
        if allowed.iter().any(|s| s == &self.state) {
            Ok(())
        } else {
            Err(self.transition_error(action))
        }
    }

    fn transition_error(&self, action: &str) -> CoreError {
        CoreError::InvalidCheckoutTransition {
            state: self.state.name().to_string(),
            action: action.to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
