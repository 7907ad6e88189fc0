//! # Error Types
//!
//! Domain-specific error types for koperasi-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  koperasi-core errors (this file)                                      │
//! │  ├── CoreError         - Business rule violations                      │
//! │  ├── ValidationErrors  - Field-by-field input failures                 │
//! │  └── ValidationError   - One failed field                              │
//! │                                                                         │
//! │  koperasi-db errors (separate crate)                                   │
//! │  └── DbError           - Database operation failures                   │
//! │                                                                         │
//! │  Server errors (in app)                                                │
//! │  └── ApiError          - What the UI sees (serialized)                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use std::fmt;

use thiserror::Error;

use crate::money::Money;
use crate::permissions::{Module, Role};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are caught at the
/// operation boundary and translated into user-readable messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// One or more input fields failed schema validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Insufficient stock to complete the cart line.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "BRS-5KG", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 BRS-5KG in stock"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Payment tendered is below the order total.
    #[error("Insufficient payment: total {total}, paid {paid}")]
    InsufficientPayment { total: Money, paid: Money },

    /// Checkout attempted with no cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The checkout workflow does not allow this step from its current state.
    #[error("Cannot {action} while checkout is {state}")]
    InvalidCheckoutTransition { state: String, action: String },

    /// The atomic order write group failed and was rolled back.
    ///
    /// Nothing was persisted; the cart stays in `PENDING_PAYMENT` and the
    /// cashier may resubmit.
    #[error("Order creation failed: {reason}")]
    OrderCreationFailed { reason: String },

    /// The role lacks permission for the module.
    #[error("Role {role} may not access module {module}")]
    Unauthorized { role: Role, module: Module },

    /// The operation would break a reference held by other records.
    #[error("{entity} {id} is still referenced: {reason}")]
    ReferentialIntegrityViolation {
        entity: String,
        id: String,
        reason: String,
    },

    /// A member withdrawal exceeds the member's savings balance.
    #[error("Insufficient balance for member {member}: balance {balance}, requested {requested}")]
    InsufficientMemberBalance {
        member: String,
        balance: Money,
        requested: Money,
    },

    /// Ledger rows generated by a POS order cannot be edited or removed.
    #[error("Transaction {transaction_id} belongs to order {order_id} and cannot be changed")]
    LinkedTransaction {
        transaction_id: String,
        order_id: String,
    },

    /// Unknown username or wrong password (deliberately indistinguishable).
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("Account has been deactivated")]
    AccountDeactivated,
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an OrderCreationFailed error.
    pub fn order_failed(reason: impl Into<String>) -> Self {
        CoreError::OrderCreationFailed {
            reason: reason.into(),
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(ValidationErrors::from(err))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// The name of the field that failed.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Duplicate { field, .. } => field,
        }
    }
}

// =============================================================================
// Validation Error List
// =============================================================================

/// Every field failure found in one input, reported together.
///
/// ## Usage
/// ```rust
/// use koperasi_core::error::ValidationErrors;
/// use koperasi_core::validation::{validate_sku, validate_product_name};
///
/// let mut errors = ValidationErrors::new();
/// errors.check(validate_sku(""));
/// errors.check(validate_product_name("Beras 5kg"));
/// assert_eq!(errors.len(), 1);
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors(Vec::new())
    }

    /// Records the error of a failed check, ignores a passed one.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) {
        if let Err(err) = result {
            self.0.push(err);
        }
    }

    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// `Ok(())` when no check failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        ValidationErrors(vec![err])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "BRS-5KG".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for BRS-5KG: available 3, requested 5"
        );

        let err = CoreError::InsufficientPayment {
            total: Money::from_rupiah(65_000),
            paid: Money::from_rupiah(60_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: total Rp 65.000, paid Rp 60.000"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");
        assert_eq!(err.field(), "sku");

        let err = ValidationError::TooShort {
            field: "name".to_string(),
            min: 3,
        };
        assert_eq!(err.to_string(), "name must be at least 3 characters");
    }

    #[test]
    fn test_validation_errors_collects_all_failures() {
        let mut errors = ValidationErrors::new();
        errors.check::<()>(Err(ValidationError::Required {
            field: "sku".to_string(),
        }));
        errors.check::<()>(Ok(()));
        errors.check::<()>(Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }));

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.to_string(),
            "sku is required; quantity must be positive"
        );
        let fields: Vec<&str> = errors.iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["sku", "quantity"]);
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(ref e) if e.len() == 1));
    }
}
