//! # Domain Types
//!
//! Core domain types used throughout the koperasi store.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐                 │
//! │  │    User      │   │   Product    │   │    Order     │                 │
//! │  │  role        │   │  sku         │   │  totals      │                 │
//! │  │  is_active   │   │  stock ≥ 0   │   │  payment     │                 │
//! │  └──────────────┘   │  version     │   │  OrderItem[] │                 │
//! │                     └──────┬───────┘   └──────┬───────┘                 │
//! │  ┌──────────────┐          │                  │                         │
//! │  │ Category     │◄─────────┤                  ▼                         │
//! │  │ Supplier     │◄─────────┘        ┌──────────────────┐                │
//! │  └──────────────┘                   │ LedgerTransaction│                │
//! │                                     │ StockMovement    │                │
//! │                                     │ ActivityLog      │                │
//! │                                     └──────────────────┘                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary columns are plain `i64` rupiah so rows map straight onto the
//! database; accessors wrap them in [`Money`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::{TransactionCategory, TransactionType};
use crate::money::Money;
use crate::permissions::{Module, Role};
use crate::stock::MovementType;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%; 1100 bps = 11% (PPN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// User
// =============================================================================

/// A staff account. Never hard-deleted; `is_active` turns it off.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Category & Supplier
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Number of products referencing this category.
    pub product_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A goods supplier. Cannot be deleted while products reference it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Number of products supplied.
    pub product_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// `stock` only changes through stock movements (manual adjustments and
/// completed orders); `version` increments on every stock write so that a
/// decrement can be made conditional on the row not having moved since it
/// was validated.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub purchase_price: i64,
    pub selling_price: i64,
    pub stock: i64,
    /// Low-stock threshold.
    pub min_stock: i64,
    /// Display unit ("pcs", "kg", "karung").
    pub unit: String,
    pub is_active: bool,
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_rupiah(self.selling_price)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_rupiah(self.purchase_price)
    }

    /// Stock at or below the threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Whether `quantity` more units can leave the shelf.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && quantity > 0 && self.stock >= quantity
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order status. Only completed checkouts are persisted; drafts and open
/// payment dialogs live with the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Qris,
    Debit,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::Qris => "QRIS",
            PaymentMethod::Debit => "DEBIT",
        }
    }
}

/// A completed POS sale.
///
/// ## Invariants
/// - `total == subtotal − discount + tax` (floored at zero)
/// - `change_amount == payment_amount − total`
/// - `payment_amount ≥ total`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    /// Receipt number, `INV-YYYYMMDD-XXXXXX`.
    pub order_number: String,
    pub user_id: String,
    pub subtotal: i64,
    pub discount: i64,
    pub tax: i64,
    pub total: i64,
    pub payment_amount: i64,
    pub change_amount: i64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_rupiah(self.total)
    }

    /// Checks the stored figures against the order arithmetic.
    pub fn is_consistent(&self) -> bool {
        let expected_total = (self.subtotal - self.discount + self.tax).max(0);
        self.total == expected_total
            && self.change_amount == self.payment_amount - self.total
            && self.payment_amount >= self.total
    }
}

/// A line on a completed order.
/// Uses the snapshot pattern: name, SKU and price are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub subtotal: i64,
}

/// An order with its lines, as printed on the receipt.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub cashier_name: String,
}

// =============================================================================
// Ledger
// =============================================================================

/// A cash-flow entry in the cooperative's ledger.
///
/// `amount` is always positive; the sign of its effect on the balance comes
/// from `transaction_type`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    pub id: String,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub amount: i64,
    pub description: String,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    /// Set when the row was generated by a POS checkout.
    pub order_id: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl LedgerTransaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_rupiah(self.amount)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Append-only audit row for one stock change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Signed change applied to the product's stock.
    pub quantity: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    /// Order id for sales, free text otherwise.
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Activity Log
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Activate,
    Deactivate,
    Checkout,
    StockAdjust,
    Deposit,
    Withdraw,
    Export,
    Login,
    LoginFailed,
    Logout,
    AccessDenied,
}

/// Append-only audit record. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub module: Module,
    pub action: ActivityAction,
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An activity row to append alongside a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub user_id: Option<String>,
    pub module: Module,
    pub action: ActivityAction,
    pub description: String,
}

impl NewActivity {
    pub fn new(
        user_id: impl Into<String>,
        module: Module,
        action: ActivityAction,
        description: impl Into<String>,
    ) -> Self {
        NewActivity {
            user_id: Some(user_id.into()),
            module,
            action,
            description: description.into(),
        }
    }

    /// An event with no authenticated user (e.g. a failed login).
    pub fn anonymous(
        module: Module,
        action: ActivityAction,
        description: impl Into<String>,
    ) -> Self {
        NewActivity {
            user_id: None,
            module,
            action,
            description: description.into(),
        }
    }
}

// =============================================================================
// Read Models
// =============================================================================

/// Result of a manual stock movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product: Product,
    pub movement: StockMovement,
    /// The purchase expense booked for a restock, when requested.
    pub expense: Option<LedgerTransaction>,
}

/// Headline figures for the dashboard, "today" in store-local time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub today_sales: Money,
    pub today_orders: i64,
    pub today_cash_in: Money,
    pub today_cash_out: Money,
    /// All-time cash balance.
    pub balance: Money,
    pub active_products: i64,
    pub low_stock_count: i64,
    pub member_count: i64,
}

/// A best-selling product over a period.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: i64,
}

/// Order totals over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub order_count: i64,
    pub subtotal: i64,
    pub discount: i64,
    pub tax: i64,
    pub total: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
