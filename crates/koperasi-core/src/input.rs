//! # Input Schemas
//!
//! Request bodies for every mutating operation. Each schema checks types via
//! serde and field rules via `validate()`, which reports *all* failing fields
//! at once so the form can highlight them together.
//!
//! ```text
//! JSON body ──serde──► XxxInput ──validate()──► repository
//!     │                    │
//!     └─ wrong type/enum   └─ required, length, positivity, cross-field
//!        → 422                → 400 with field list
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::checkout::{CheckoutItem, CheckoutSession};
use crate::error::{ValidationError, ValidationErrors};
use crate::ledger::{member_name_of, TransactionCategory, TransactionType};
use crate::money::Money;
use crate::permissions::Role;
use crate::stock::MovementType;
use crate::types::{PaymentMethod, TaxRate};
use crate::validation::{
    validate_amount, validate_cart_size, validate_email, validate_money, validate_name,
    validate_non_negative, validate_optional_text, validate_password, validate_price,
    validate_product_name,
    validate_quantity, validate_sku, validate_username, validate_uuid,
};

const NOTES_MAX: usize = 500;
const DESCRIPTION_MAX: usize = 500;

fn validate_optional_uuid(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    if let Some(id) = value.filter(|v| !v.trim().is_empty()) {
        errors.check(validate_uuid(field, id));
    }
}

fn validate_optional_email(errors: &mut ValidationErrors, value: Option<&str>) {
    if let Some(email) = value.filter(|v| !v.trim().is_empty()) {
        errors.check(validate_email(email));
    }
}

// =============================================================================
// Auth & Users
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.username.trim().is_empty() {
            errors.push(ValidationError::Required {
                field: "username".to_string(),
            });
        }
        if self.password.is_empty() {
            errors.push(ValidationError::Required {
                field: "password".to_string(),
            });
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Role,
}

impl CreateUserInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_username(&self.username));
        errors.check(validate_email(&self.email));
        errors.check(validate_name("fullName", &self.full_name, 100));
        errors.check(validate_password(&self.password));
        errors.into_result()
    }
}

/// Profile and role edit. `password` resets the password when present.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub password: Option<String>,
}

impl UpdateUserInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_email(&self.email));
        errors.check(validate_name("fullName", &self.full_name, 100));
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            errors.check(validate_password(password));
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveInput {
    pub is_active: bool,
}

// =============================================================================
// Reference Data
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_name("name", &self.name, 100));
        errors.check(validate_optional_text(
            "description",
            self.description.as_deref(),
            DESCRIPTION_MAX,
        ));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInput {
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl SupplierInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_name("name", &self.name, 150));
        errors.check(validate_optional_text("contactPerson", self.contact_person.as_deref(), 100));
        errors.check(validate_optional_text("address", self.address.as_deref(), DESCRIPTION_MAX));
        validate_optional_email(&mut errors, self.email.as_deref());

        if let Some(phone) = self.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            let ok = phone.len() <= 20
                && phone
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
            if !ok {
                errors.push(ValidationError::InvalidFormat {
                    field: "phone".to_string(),
                    reason: "must be a phone number".to_string(),
                });
            }
        }
        errors.into_result()
    }
}

// =============================================================================
// Products & Stock
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    pub purchase_price: i64,
    pub selling_price: i64,
    /// Opening stock, recorded as an IN movement.
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "pcs".to_string()
}

impl CreateProductInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_sku(&self.sku));
        errors.check(validate_product_name(&self.name));
        errors.check(validate_optional_text(
            "description",
            self.description.as_deref(),
            DESCRIPTION_MAX,
        ));
        validate_optional_uuid(&mut errors, "categoryId", self.category_id.as_deref());
        validate_optional_uuid(&mut errors, "supplierId", self.supplier_id.as_deref());
        errors.check(validate_price("purchasePrice", self.purchase_price));
        errors.check(validate_price("sellingPrice", self.selling_price));
        errors.check(validate_non_negative("stock", self.stock));
        errors.check(validate_non_negative("minStock", self.min_stock));
        errors.check(validate_name("unit", &self.unit, 20));
        errors.into_result()
    }
}

/// Product edit. Stock is deliberately absent: it only moves through
/// stock adjustments and sales.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    pub purchase_price: i64,
    pub selling_price: i64,
    pub min_stock: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl UpdateProductInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_sku(&self.sku));
        errors.check(validate_product_name(&self.name));
        errors.check(validate_optional_text(
            "description",
            self.description.as_deref(),
            DESCRIPTION_MAX,
        ));
        validate_optional_uuid(&mut errors, "categoryId", self.category_id.as_deref());
        validate_optional_uuid(&mut errors, "supplierId", self.supplier_id.as_deref());
        errors.check(validate_price("purchasePrice", self.purchase_price));
        errors.check(validate_price("sellingPrice", self.selling_price));
        errors.check(validate_non_negative("minStock", self.min_stock));
        errors.check(validate_name("unit", &self.unit, 20));
        errors.into_result()
    }
}

/// A manual stock movement.
///
/// `quantity` is a positive magnitude for IN/OUT and a signed delta for
/// ADJUSTMENT. With `recordExpense`, an IN movement also books a
/// CASH_OUT/PURCHASE ledger row of `quantity × purchasePrice`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentInput {
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: i64,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub record_expense: bool,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl StockAdjustmentInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(self.movement_type.signed_delta(self.quantity));
        errors.check(validate_optional_text("reference", self.reference.as_deref(), 100));
        errors.check(validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX));
        if self.record_expense && self.movement_type != MovementType::In {
            errors.push(ValidationError::NotAllowed {
                field: "recordExpense".to_string(),
                allowed: vec!["IN".to_string()],
            });
        }
        errors.into_result()
    }
}

// =============================================================================
// POS
// =============================================================================

/// Cart contents priced without taking payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInput {
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub discount: i64,
    #[serde(default)]
    pub tax: Option<i64>,
}

impl QuoteInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate_cart_lines(&self.items, self.discount, self.tax)
    }

    pub fn into_session(self, tax_rate: TaxRate) -> CheckoutSession {
        CheckoutSession::new(
            self.items,
            Money::from_rupiah(self.discount),
            self.tax.map(Money::from_rupiah),
            tax_rate,
            PaymentMethod::Cash,
            None,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub discount: i64,
    /// Explicit tax; the store default rate applies when omitted.
    #[serde(default)]
    pub tax: Option<i64>,
    pub payment_amount: i64,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = match validate_cart_lines(&self.items, self.discount, self.tax) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        errors.check(validate_money("paymentAmount", self.payment_amount));
        errors.check(validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX));
        errors.into_result()
    }

    pub fn into_session(self, tax_rate: TaxRate) -> (CheckoutSession, Money) {
        let payment = Money::from_rupiah(self.payment_amount);
        let session = CheckoutSession::new(
            self.items,
            Money::from_rupiah(self.discount),
            self.tax.map(Money::from_rupiah),
            tax_rate,
            self.payment_method,
            self.notes,
        );
        (session, payment)
    }
}

fn validate_cart_lines(
    items: &[CheckoutItem],
    discount: i64,
    tax: Option<i64>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if items.is_empty() {
        errors.push(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    errors.check(validate_cart_size(items.len()));
    for (index, item) in items.iter().enumerate() {
        errors.check(validate_uuid(&format!("items[{}].productId", index), &item.product_id));
        if validate_quantity(item.quantity).is_err() {
            errors.push(ValidationError::OutOfRange {
                field: format!("items[{}].quantity", index),
                min: 1,
                max: crate::MAX_ITEM_QUANTITY,
            });
        }
    }
    errors.check(validate_money("discount", discount));
    if let Some(tax) = tax {
        errors.check(validate_money("tax", tax));
    }
    errors.into_result()
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub amount: i64,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub supplier_id: Option<String>,
}

impl TransactionInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_amount("amount", self.amount));
        errors.check(validate_name("description", &self.description, DESCRIPTION_MAX));
        errors.check(validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX));
        validate_optional_uuid(&mut errors, "supplierId", self.supplier_id.as_deref());

        if let Some(required) = self.category.required_type() {
            if required != self.transaction_type {
                errors.push(ValidationError::NotAllowed {
                    field: "type".to_string(),
                    allowed: vec![required.as_str().to_string()],
                });
            }
        }

        if self.category.is_member() && member_name_of(&self.description).is_none() {
            errors.push(ValidationError::InvalidFormat {
                field: "description".to_string(),
                reason: "member rows must read '<Simpanan|Penarikan> - <member name>'".to_string(),
            });
        }
        errors.into_result()
    }
}

/// A member savings deposit or withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MemberMovementInput {
    pub member_name: String,
    pub amount: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl MemberMovementInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_name("memberName", &self.member_name, 100));
        if self.member_name.contains(" - ") {
            errors.push(ValidationError::InvalidFormat {
                field: "memberName".to_string(),
                reason: "must not contain ' - '".to_string(),
            });
        }
        errors.check(validate_amount("amount", self.amount));
        errors.check(validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX));
        errors.into_result()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
