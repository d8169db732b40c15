//! # Error Types
//!
//! Domain-specific error types for bazaar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bazaar-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  ├── ErrorKind        - Machine-checkable code per failure             │
//! │  └── ErrorClass       - Validation / NotFound / StateConflict /        │
//! │                         Persistence                                     │
//! │                                                                         │
//! │  bazaar-db errors (separate crate)                                     │
//! │  └── DbError          - Wraps CoreError + database failures            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ErrorReport (JSON)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, order, amounts)
//! 3. Every variant maps to exactly one [`ErrorKind`]
//! 4. Validation happens before the first write; errors never leave partial state

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;
use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found (or was soft-deleted).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer cannot be found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Category cannot be found.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Requested quantity exceeds current stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Create order (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Linen Shirt", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Shell shows: "Insufficient stock for Linen Shirt: available 3, requested 5"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Submitted unit price is negative.
    #[error("Invalid price for {product}: {price}")]
    InvalidPrice { product: String, price: Money },

    /// An order must carry at least one line.
    #[error("Order has no lines")]
    EmptyOrder,

    /// Only pending orders can be rolled back.
    #[error("Order {order_id} is {status}, only pending orders can be deleted")]
    OrderNotDeletable {
        order_id: String,
        status: OrderStatus,
    },

    /// Partial payment against an order that is already settled.
    #[error("Order {0} is already fully paid")]
    OrderAlreadyPaid(String),

    /// Payment is non-positive or exceeds the remaining balance.
    #[error("Invalid payment of {amount}: must be positive and at most {remaining}")]
    InvalidPaymentAmount { amount: Money, remaining: Money },

    /// Phone numbers identify customers and must be unique.
    #[error("Phone number {0} already exists")]
    DuplicatePhoneNumber(String),

    /// Category names must be unique.
    #[error("Category '{0}' already exists")]
    DuplicateCategory(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the machine-checkable code for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_) => ErrorKind::ProductNotFound,
            CoreError::CustomerNotFound(_) => ErrorKind::CustomerNotFound,
            CoreError::OrderNotFound(_) => ErrorKind::OrderNotFound,
            CoreError::CategoryNotFound(_) => ErrorKind::CategoryNotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InvalidPrice { .. } => ErrorKind::InvalidPrice,
            CoreError::EmptyOrder => ErrorKind::EmptyOrder,
            CoreError::OrderNotDeletable { .. } => ErrorKind::OrderNotDeletable,
            CoreError::OrderAlreadyPaid(_) => ErrorKind::OrderAlreadyPaid,
            CoreError::InvalidPaymentAmount { .. } => ErrorKind::InvalidPaymentAmount,
            CoreError::DuplicatePhoneNumber(_) => ErrorKind::DuplicatePhoneNumber,
            CoreError::DuplicateCategory(_) => ErrorKind::DuplicateCategory,
            CoreError::Validation(_) => ErrorKind::ValidationError,
        }
    }

    /// Returns the taxonomy class for this error.
    ///
    /// `InvalidPaymentAmount` is a validation failure when the amount is
    /// non-positive, and a state conflict when it overpays.
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::InvalidPaymentAmount { amount, .. } if !amount.is_positive() => {
                ErrorClass::Validation
            }
            _ => self.kind().class(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet shape/range requirements and
/// are always raised before any write.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-digit phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Error Kind / Class
// =============================================================================

/// Machine-checkable error codes.
///
/// ## Serialization
/// ```json
/// { "kind": "INSUFFICIENT_STOCK", "class": "STATE_CONFLICT", "message": "..." }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorKind {
    ProductNotFound,
    CustomerNotFound,
    OrderNotFound,
    CategoryNotFound,
    InsufficientStock,
    InvalidPrice,
    EmptyOrder,
    OrderNotDeletable,
    OrderAlreadyPaid,
    InvalidPaymentAmount,
    DuplicatePhoneNumber,
    DuplicateCategory,
    ValidationError,
    /// Store unreachable or a write failed.
    Persistence,
}

/// Error taxonomy classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorClass {
    /// Bad input shape or range.
    Validation,
    /// A referenced entity is missing.
    NotFound,
    /// Operation disallowed in the current state.
    StateConflict,
    /// Store unreachable or write failure.
    Persistence,
}

impl ErrorKind {
    /// Returns the default taxonomy class of this kind.
    pub fn class(self) -> ErrorClass {
        match self {
            ErrorKind::InvalidPrice | ErrorKind::EmptyOrder | ErrorKind::ValidationError => {
                ErrorClass::Validation
            }
            ErrorKind::ProductNotFound
            | ErrorKind::CustomerNotFound
            | ErrorKind::OrderNotFound
            | ErrorKind::CategoryNotFound => ErrorClass::NotFound,
            ErrorKind::InsufficientStock
            | ErrorKind::OrderNotDeletable
            | ErrorKind::OrderAlreadyPaid
            | ErrorKind::InvalidPaymentAmount
            | ErrorKind::DuplicatePhoneNumber
            | ErrorKind::DuplicateCategory => ErrorClass::StateConflict,
            ErrorKind::Persistence => ErrorClass::Persistence,
        }
    }
}

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
            product: "Linen Shirt".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Linen Shirt: available 3, requested 5"
        );

        let err = CoreError::OrderNotDeletable {
            order_id: "o-1".to_string(),
            status: OrderStatus::PartiallyPaid,
        };
        assert_eq!(
            err.to_string(),
            "Order o-1 is partiallyPaid, only pending orders can be deleted"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "fullName".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_payment_amount_class_depends_on_sign() {
        let non_positive = CoreError::InvalidPaymentAmount {
            amount: Money::zero(),
            remaining: Money::from_cents(500),
        };
        assert_eq!(non_positive.class(), ErrorClass::Validation);

        let overpay = CoreError::InvalidPaymentAmount {
            amount: Money::from_cents(600),
            remaining: Money::from_cents(500),
        };
        assert_eq!(overpay.class(), ErrorClass::StateConflict);
    }

    #[test]
    fn test_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::OrderNotDeletable).unwrap();
        assert_eq!(json, "\"ORDER_NOT_DELETABLE\"");
        let json = serde_json::to_string(&ErrorClass::StateConflict).unwrap();
        assert_eq!(json, "\"STATE_CONFLICT\"");
    }
}
