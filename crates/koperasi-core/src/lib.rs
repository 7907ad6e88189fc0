//! # koperasi-core: Pure Business Logic for the Koperasi Store
//!
//! This crate holds the business rules of the cooperative store as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Koperasi Store Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web UI (browser)                             │   │
//! │  │    POS ──► Inventory ──► Financial ──► Members ──► Reports     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    koperasi-server (axum)                       │   │
//! │  │    session cookie, RBAC gate, error mapping                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ koperasi-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │  cart   │ │ checkout │ │ ledger │ │ period  │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └────────┘ └─────────┘  │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  stock  │ │validation│ │ export │ │  input  │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └────────┘ └─────────┘  │   │
//! │  │                    ┌─────────────┐                              │   │
//! │  │                    │ permissions │                              │   │
//! │  │                    └─────────────┘                              │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 koperasi-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Order, LedgerTransaction, ...)
//! - [`money`] - Rupiah amounts with integer arithmetic
//! - [`cart`] - Cart and totals calculator
//! - [`checkout`] - Order completion state machine
//! - [`stock`] - Stock movement arithmetic
//! - [`ledger`] - Balance, daily series and member savings
//! - [`period`] - Period filters resolved to half-open time ranges
//! - [`permissions`] - Role × module gate
//! - [`validation`] - Field validators and stock/payment checks
//! - [`input`] - Request schemas with field-by-field validation
//! - [`export`] - Ledger CSV export and parsing
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use koperasi_core::cart::{compute_change, compute_totals, LineItem};
//! use koperasi_core::money::Money;
//!
//! let lines = [
//!     LineItem::new(Money::from_rupiah(10_000), 2),
//!     LineItem::new(Money::from_rupiah(15_000), 3),
//! ];
//! let totals = compute_totals(&lines, Money::zero(), Money::zero()).unwrap();
//! assert_eq!(totals.total.rupiah(), 65_000);
//!
//! let change = compute_change(totals.total, Money::from_rupiah(70_000)).unwrap();
//! assert_eq!(change.rupiah(), 5_000);
//! assert!(compute_change(totals.total, Money::from_rupiah(60_000)).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod export;
pub mod input;
pub mod ledger;
pub mod money;
pub mod period;
pub mod permissions;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError, ValidationErrors};
pub use money::Money;
pub use permissions::{Module, Role};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typing 1000 instead of 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest money value accepted from input: Rp 1 trillion.
///
/// With [`MAX_ITEM_QUANTITY`] and [`MAX_CART_ITEMS`] a cart total stays
/// below `10^18`, inside `i64`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Description prefix of member deposit ledger rows.
pub const MEMBER_DEPOSIT_PREFIX: &str = "Simpanan";

/// Description prefix of member withdrawal ledger rows.
pub const MEMBER_WITHDRAWAL_PREFIX: &str = "Penarikan";
