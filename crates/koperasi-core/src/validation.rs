//! # Validation Module
//!
//! Field validators plus the stock and payment checks guarding checkout.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser                                                      │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Re-check stock on every quantity change                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Server handler (Rust)                                        │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: field rules, stock and payment checks                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK (stock >= 0) constraints                         │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use koperasi_core::validation::{can_add_to_cart, validate_quantity, validate_sku};
//!
//! validate_sku("BRS-5KG").unwrap();
//! validate_quantity(5).unwrap();
//!
//! // 3 already in the cart, 2 more requested, 5 on the shelf
//! assert!(can_add_to_cart(2, 3, 5));
//! assert!(!can_add_to_cart(3, 3, 5));
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{MAX_AMOUNT, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, digits, hyphens and underscores
///
/// ## Example
/// ```rust
/// use koperasi_core::validation::validate_sku;
///
/// assert!(validate_sku("MNY-GRG-1L").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1 to 200 characters).
///
/// ## Example
/// ```rust
/// use koperasi_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Minyak Goreng 1L").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, 200)
}

/// Validates a required free-text name field of at most `max` characters.
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional free-text field; `None` and empty always pass.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a login username.
///
/// ## Rules
/// - 3 to 50 characters
/// - Lowercase letters, digits, `.`, `_` and `-`
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }

    if username.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only lowercase letters, numbers, '.', '_' and '-'".to_string(),
        });
    }

    Ok(())
}

/// Validates a new password (6 to 128 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }

    if password.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Only the shape is checked: one `@`, non-empty local part, a dot in the
/// domain, no whitespace.
///
/// ## Example
/// ```rust
/// use koperasi_core::validation::validate_email;
///
/// assert!(validate_email("admin@koperasi.local").is_ok());
/// assert!(validate_email("admin@").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > max? → Error: "quantity must be between ..."           │
/// │       │                                                                 │
/// │       └── OK → can_add_to_cart against the shelf                       │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
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

/// Validates a price in rupiah. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use koperasi_core::validation::validate_price;
///
/// assert!(validate_price("sellingPrice", 68_000).is_ok());
/// assert!(validate_price("sellingPrice", 0).is_ok());
/// assert!(validate_price("sellingPrice", -100).is_err());
/// ```
pub fn validate_price(field: &str, rupiah: i64) -> ValidationResult<()> {
    validate_money(field, rupiah)
}

/// Validates a money value that may be zero: discounts, tax, tendered cash.
///
/// Bounded by [`MAX_AMOUNT`] so line and cart arithmetic cannot overflow.
pub fn validate_money(field: &str, rupiah: i64) -> ValidationResult<()> {
    validate_non_negative(field, rupiah)?;
    validate_at_most(field, rupiah, 0)
}

/// Validates a value that may be zero but not negative.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a ledger or payment amount, which must be strictly positive.
pub fn validate_amount(field: &str, rupiah: i64) -> ValidationResult<()> {
    if rupiah <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    validate_at_most(field, rupiah, 1)
}

fn validate_at_most(field: &str, rupiah: i64, min: i64) -> ValidationResult<()> {
    if rupiah > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "taxRate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of distinct cart lines.
pub fn validate_cart_size(line_count: usize) -> ValidationResult<()> {
    if line_count > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use koperasi_core::validation::validate_uuid;
///
/// assert!(validate_uuid("productId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("productId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Stock & Payment Checks
// =============================================================================

/// Whether `requested` more units fit on top of what the cart already holds.
///
/// True iff `current_cart_qty + requested ≤ available`. Called on every
/// quantity change because stock moves while the cart is open.
pub fn can_add_to_cart(requested: i64, current_cart_qty: i64, available: i64) -> bool {
    requested > 0 && current_cart_qty >= 0 && current_cart_qty + requested <= available
}

/// Fails with `InsufficientStock` when `requested` exceeds `available`.
pub fn ensure_stock(sku: &str, requested: i64, available: i64) -> CoreResult<()> {
    if requested > available {
        return Err(CoreError::InsufficientStock {
            sku: sku.to_string(),
            available,
            requested,
        });
    }

    Ok(())
}

/// Fails with `InsufficientPayment` when `paid` is below `total`.
pub fn ensure_payment(total: Money, paid: Money) -> CoreResult<()> {
    if paid < total {
        return Err(CoreError::InsufficientPayment { total, paid });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("BRS-5KG").is_ok());
        assert!(validate_sku("GULA1KG").is_ok());
        assert!(validate_sku("telur_10").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Beras Premium 5kg").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("kasir").is_ok());
        assert!(validate_username("super.admin_2").is_ok());

        assert!(matches!(
            validate_username("ab"),
            Err(ValidationError::TooShort { .. })
        ));
        assert!(validate_username("Kasir").is_err());
        assert!(validate_username("kasir satu").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("12345").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("kasir@koperasi.local").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("kasir").is_err());
        assert!(validate_email("@koperasi.local").is_err());
        assert!(validate_email("kasir@local").is_err());
        assert!(validate_email("ka sir@koperasi.local").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price("purchasePrice", 0).is_ok());
        assert!(validate_price("purchasePrice", -1).is_err());
        assert!(validate_amount("amount", 1).is_ok());
        assert!(validate_amount("amount", 0).is_err());
        assert!(validate_non_negative("discount", 0).is_ok());
        assert!(validate_price("sellingPrice", MAX_AMOUNT).is_ok());
        assert!(matches!(
            validate_price("sellingPrice", 5_000_000_000_000_000_000),
            Err(ValidationError::OutOfRange { max: MAX_AMOUNT, .. })
        ));
        assert!(validate_amount("amount", MAX_AMOUNT + 1).is_err());
        assert!(validate_money("discount", MAX_AMOUNT + 1).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS + 1).is_err());
    }

    #[test]
    fn test_can_add_to_cart_boundary() {
        assert!(can_add_to_cart(5, 0, 5));
        assert!(!can_add_to_cart(1, 5, 5));
        assert!(!can_add_to_cart(0, 0, 5));
        assert!(!can_add_to_cart(1, 0, 0));
    }

    #[test]
    fn test_ensure_stock_and_payment() {
        assert!(ensure_stock("BRS-5KG", 5, 5).is_ok());
        let err = ensure_stock("BRS-5KG", 6, 5).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 5, requested: 6, .. }
        ));

        let total = Money::from_rupiah(65_000);
        assert!(ensure_payment(total, Money::from_rupiah(65_000)).is_ok());
        assert!(matches!(
            ensure_payment(total, Money::from_rupiah(60_000)),
            Err(CoreError::InsufficientPayment { .. })
        ));
    }
}
