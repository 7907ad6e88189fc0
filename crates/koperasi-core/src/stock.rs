//! # Stock Movements
//!
//! Arithmetic behind every change to `Product.stock`.
//!
//! ```text
//! IN          +quantity   restock / initial stock
//! OUT         −quantity   sale or manual removal, never below zero
//! ADJUSTMENT  ±quantity   stock-take correction (signed)
//! ```
//!
//! Movements are append-only, so the current stock can always be rebuilt by
//! summing them in order; see [`reconstruct_stock`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::StockMovement;
use crate::MAX_ITEM_QUANTITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    Adjustment,
}

impl MovementType {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }

    /// Converts a requested quantity into the signed stock delta.
    ///
    /// IN and OUT take a positive magnitude; ADJUSTMENT takes a non-zero
    /// signed delta.
    pub fn signed_delta(self, quantity: i64) -> Result<i64, ValidationError> {
        let limit = MAX_ITEM_QUANTITY * 100;
        match self {
            MovementType::In | MovementType::Out if quantity <= 0 => {
                Err(ValidationError::MustBePositive {
                    field: "quantity".to_string(),
                })
            }
            MovementType::Adjustment if quantity == 0 => Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: -limit,
                max: limit,
            }),
            _ if quantity.abs() > limit => Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: -limit,
                max: limit,
            }),
            MovementType::In | MovementType::Adjustment => Ok(quantity),
            MovementType::Out => Ok(-quantity),
        }
    }
}

/// The outcome of applying one movement to a stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub delta: i64,
    pub stock_before: i64,
    pub stock_after: i64,
}

/// Applies a movement to `current`, refusing to go below zero.
///
/// ## Example
/// ```rust
/// use koperasi_core::stock::{apply_movement, MovementType};
///
/// let change = apply_movement("BRS-5KG", 5, MovementType::Out, 5).unwrap();
/// assert_eq!(change.stock_after, 0);
/// assert!(apply_movement("BRS-5KG", 0, MovementType::Out, 1).is_err());
/// ```
pub fn apply_movement(
    sku: &str,
    current: i64,
    movement_type: MovementType,
    quantity: i64,
) -> CoreResult<StockChange> {
    let delta = movement_type.signed_delta(quantity)?;
    let stock_after = current + delta;
    if stock_after < 0 {
        return Err(CoreError::InsufficientStock {
            sku: sku.to_string(),
            available: current,
            requested: -delta,
        });
    }

    Ok(StockChange {
        delta,
        stock_before: current,
        stock_after,
    })
}

/// Rebuilds a product's stock from its full movement history.
pub fn reconstruct_stock(movements: &[StockMovement]) -> i64 {
    movements.iter().map(|m| m.quantity).sum()
}

/// Checks that each movement starts where the previous one ended and that
/// its before/after figures agree with its quantity.
///
/// `movements` must be in chronological order.
pub fn history_is_consistent(movements: &[StockMovement]) -> bool {
    let mut expected_before = 0;
    for m in movements {
        if m.stock_before != expected_before
            || m.stock_after != m.stock_before + m.quantity
            || m.stock_after < 0
        {
            return false;
        }
        expected_before = m.stock_after;
    }
    true
}

// =============================================================================
// Unit Tests
// =============================================================================
