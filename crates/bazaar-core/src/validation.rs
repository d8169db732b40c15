//! # Validation Module
//!
//! Input validation for the back-office stores and the Order Engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Shell (forms)                                                │
//! │  └── Basic format checks, immediate user feedback                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + order/payment planning                         │
//! │  └── Shape and range rules, run before any write                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0), CHECK (amount_paid <= total)               │
//! │  └── UNIQUE (phone_number), UNIQUE (category name)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::validation::{validate_phone_number, validate_quantity};
//!
//! validate_phone_number("96170123456").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_LINES, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
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

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Linen Shirt").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, 200)
}

/// Validates a customer's full name (required, at most 120 characters).
pub fn validate_full_name(name: &str) -> ValidationResult<()> {
    validate_required_text("fullName", name, 120)
}

/// Validates a category name (required, at most 80 characters).
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, 80)
}

/// Validates a phone number.
///
/// ## Rules
/// - Optional leading `+`
/// - 6 to 20 digits, nothing else
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_phone_number;
///
/// assert!(validate_phone_number("+96170123456").is_ok());
/// assert!(validate_phone_number("70-123-456").is_err());
/// ```
pub fn validate_phone_number(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phoneNumber".to_string(),
        });
    }

    let digits = phone.strip_prefix('+').unwrap_or(phone);

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phoneNumber".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if !(6..=20).contains(&digits.len()) {
        return Err(ValidationError::OutOfRange {
            field: "phoneNumber digits".to_string(),
            min: 6,
            max: 20,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock level (zero is allowed).
pub fn validate_stock_level(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
/// - Must not exceed MAX_UNIT_PRICE_CENTS
///
/// ## Example
/// ```rust
/// use bazaar_core::money::Money;
/// use bazaar_core::validation::validate_price;
///
/// assert!(validate_price("price", Money::from_cents(1099)).is_ok());
/// assert!(validate_price("price", Money::zero()).is_ok());
/// assert!(validate_price("price", Money::from_cents(-100)).is_err());
/// assert!(validate_price("price", Money::from_cents(i64::MAX)).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.cents() > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates catalog pricing: both prices non-negative, cost not above sale price.
pub fn validate_pricing(price: Money, initial_price: Money) -> ValidationResult<()> {
    validate_price("price", price)?;
    validate_price("initialPrice", initial_price)?;

    if initial_price > price {
        return Err(ValidationError::InvalidFormat {
            field: "initialPrice".to_string(),
            reason: "cost price can't be bigger than the selling price".to_string(),
        });
    }

    Ok(())
}

/// Validates a payment amount (strictly positive).
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a manually entered debt (non-negative).
pub fn validate_debt(debt: Money) -> ValidationResult<()> {
    if debt.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "debt".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on an order.
pub fn validate_order_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "order lines".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
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
    fn test_validate_names() {
        assert!(validate_product_name("Linen Shirt").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());

        assert!(validate_full_name("Rima Haddad").is_ok());
        assert!(validate_full_name("  ").is_err());

        assert!(validate_category_name("Shirts").is_ok());
        assert!(validate_category_name(&"x".repeat(81)).is_err());
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("70123456").is_ok());
        assert!(validate_phone_number("+96170123456").is_ok());

        assert!(validate_phone_number("").is_err());
        assert!(validate_phone_number("12345").is_err());
        assert!(validate_phone_number("70 123 456").is_err());
        assert!(validate_phone_number("++70123456").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());

        assert!(validate_stock_level(0).is_ok());
        assert!(validate_stock_level(-1).is_err());
    }

    #[test]
    fn test_validate_pricing() {
        assert!(validate_pricing(Money::from_cents(5000), Money::from_cents(3000)).is_ok());
        assert!(validate_pricing(Money::from_cents(5000), Money::from_cents(5000)).is_ok());
        assert!(validate_pricing(Money::from_cents(3000), Money::from_cents(5000)).is_err());
        assert!(validate_pricing(Money::from_cents(-1), Money::zero()).is_err());

        let ceiling = Money::from_cents(MAX_UNIT_PRICE_CENTS);
        assert!(validate_pricing(ceiling, ceiling).is_ok());
        assert!(validate_pricing(ceiling + Money::from_cents(1), Money::zero()).is_err());
        assert!(validate_debt(Money::from_cents(MAX_UNIT_PRICE_CENTS * 10)).is_ok());
        assert!(validate_debt(Money::from_cents(-1)).is_err());

        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
    }

    #[test]
    fn test_validate_order_size() {
        assert!(validate_order_size(1).is_ok());
        assert!(validate_order_size(MAX_ORDER_LINES).is_ok());
        assert!(validate_order_size(MAX_ORDER_LINES + 1).is_err());
    }
}
