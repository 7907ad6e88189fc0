//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Koperasi Server                    │
//! │                                                                         │
//! │  Handler: Result<Json<T>, ApiError>                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ValidationErrors ──► CoreError::Validation ──┐                         │
//! │  Business rule    ──► CoreError::*  ──────────┼──► ApiError ──► JSON    │
//! │  Database         ──► DbError::*  ────────────┘     │                   │
//! │                                                     │                   │
//! │  Internal failures are logged here and answered     ▼                   │
//! │  with a generic message.                     { code, message,           │
//! │                                                details, redirectTo }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use koperasi_core::export::CsvError;
use koperasi_core::{CoreError, ValidationError, ValidationErrors};
use koperasi_db::DbError;

/// Where the UI sends a user who opened a module they may not use.
pub const FORBIDDEN_REDIRECT: &str = "/dashboard";

/// Error body returned by every failing request.
///
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "Validation failed: sku is required",
///   "details": [{ "field": "sku", "message": "sku is required" }]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Field-by-field failures of a validation error
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,

    /// Set on access denials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// No valid session (401)
    Unauthenticated,

    /// Wrong username or password (401)
    InvalidCredentials,

    /// Account switched off (403)
    AccountDeactivated,

    /// Role lacks the module (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// Unique value already taken (409)
    Duplicate,

    /// Cart line exceeds stock (409)
    InsufficientStock,

    /// Record still referenced elsewhere (409)
    ReferentialIntegrity,

    /// Ledger row owned by an order (409)
    LinkedTransaction,

    /// Atomic order write rolled back, safe to retry (409)
    OrderCreationFailed,

    /// Payment below total (422)
    InsufficientPayment,

    /// Withdrawal above member savings (422)
    InsufficientMemberBalance,

    /// Empty cart or a checkout step out of order (422)
    InvalidCheckout,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthenticated | ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorCode::AccountDeactivated | ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Duplicate
            | ErrorCode::InsufficientStock
            | ErrorCode::ReferentialIntegrity
            | ErrorCode::LinkedTransaction
            | ErrorCode::OrderCreationFailed => StatusCode::CONFLICT,
            ErrorCode::InsufficientPayment
            | ErrorCode::InsufficientMemberBalance
            | ErrorCode::InvalidCheckout => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: Vec::new(),
            redirect_to: None,
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error with no field details.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthenticated, message)
    }

    /// Access denial carrying the redirect target.
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError {
            redirect_to: Some(FORBIDDEN_REDIRECT.to_string()),
            ..ApiError::new(ErrorCode::Forbidden, message)
        }
    }

    /// Creates an internal error. The cause must already be logged.
    pub fn internal() -> Self {
        ApiError::new(ErrorCode::Internal, "Something went wrong, please try again")
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Conversions
// =============================================================================

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(errors) => ApiError {
                details: field_errors(&errors),
                ..ApiError::validation(message)
            },
            CoreError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::InsufficientPayment { .. } => {
                ApiError::new(ErrorCode::InsufficientPayment, message)
            }
            CoreError::EmptyCart | CoreError::InvalidCheckoutTransition { .. } => {
                ApiError::new(ErrorCode::InvalidCheckout, message)
            }
            CoreError::OrderCreationFailed { .. } => {
                ApiError::new(ErrorCode::OrderCreationFailed, message)
            }
            CoreError::Unauthorized { .. } => ApiError::forbidden(message),
            CoreError::ReferentialIntegrityViolation { .. } => {
                ApiError::new(ErrorCode::ReferentialIntegrity, message)
            }
            CoreError::InsufficientMemberBalance { .. } => {
                ApiError::new(ErrorCode::InsufficientMemberBalance, message)
            }
            CoreError::LinkedTransaction { .. } => {
                ApiError::new(ErrorCode::LinkedTransaction, message)
            }
            CoreError::InvalidCredentials => ApiError::new(ErrorCode::InvalidCredentials, message),
            CoreError::AccountDeactivated => ApiError::new(ErrorCode::AccountDeactivated, message),
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rule(rule) => ApiError::from(rule),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                let message = format!("{} '{}' already exists", field, value);
                ApiError {
                    details: vec![FieldError {
                        field,
                        message: message.clone(),
                    }],
                    ..ApiError::new(ErrorCode::Duplicate, message)
                }
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::ConnectionFailed(e) | DbError::MigrationFailed(e) => {
                tracing::error!("Database unavailable: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database unavailable")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database busy, please retry")
            }
            DbError::QueryFailed(e) | DbError::TransactionFailed(e) | DbError::Internal(e) => {
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CsvError> for ApiError {
    fn from(err: CsvError) -> Self {
        tracing::error!("CSV export failed: {}", err);
        ApiError::internal()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::from(CoreError::Validation(err))
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::from(CoreError::from(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .iter()
        .map(|e| FieldError {
            field: e.field().to_string(),
            message: e.to_string(),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
