//! # Payment Reconciliation
//!
//! Computes how a payment moves an order's balances and the customer's
//! debt. Nothing here writes; `bazaar-db` persists the returned
//! [`Settlement`] inside one transaction.
//!
//! ## Debt Clamping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  debt_reduction = min(payment, debt)                                    │
//! │  new_debt       = max(0, debt − payment)                                │
//! │                                                                         │
//! │  debt = 50, order total = 80, mark fully paid                           │
//! │    debt_reduction = min(80, 50) = 50                                    │
//! │    new_debt       = max(0, 50 − 80) = 0     (not −30)                   │
//! │                                                                         │
//! │  The order's remaining balance is NOT trued-up to match the debt.       │
//! │  The two balances are independent and can drift if debt was edited.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Order, OrderStatus};
use crate::validation::validate_payment_amount;

/// Balance changes produced by one payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Amount applied to the order.
    pub payment: Money,
    /// Order's cumulative amount paid after this payment.
    pub new_amount_paid: Money,
    /// Whether the order's remaining balance reaches zero.
    pub settles_order: bool,
    pub previous_debt: Money,
    /// Amount actually taken off the customer's debt.
    ///
    /// Negative when the stored debt was already below zero (an order
    /// deleted after its debt was edited down); `new_debt` is still zero.
    pub debt_reduction: Money,
    pub new_debt: Money,
}

impl Settlement {
    /// Whether the customer's non-negative debt was smaller than the
    /// payment and got clamped at zero.
    pub fn debt_clamped(&self) -> bool {
        !self.debt_was_negative() && self.debt_reduction < self.payment
    }

    /// Whether the stored debt was already negative before this payment.
    pub fn debt_was_negative(&self) -> bool {
        self.previous_debt.is_negative()
    }

    /// Order status after the payment is applied.
    pub fn resulting_status(&self) -> OrderStatus {
        if self.settles_order {
            OrderStatus::Paid
        } else {
            OrderStatus::PartiallyPaid
        }
    }
}

fn clamp_debt(debt: Money, payment: Money) -> (Money, Money) {
    let debt_reduction = payment.min(debt);
    let new_debt = (debt - payment).floor_at_zero();
    (debt_reduction, new_debt)
}

/// Computes the settlement for marking an order fully paid.
///
/// Returns `None` when the order is already paid; the caller reports that
/// as an idempotent success without writing.
pub fn settle_in_full(order: &Order, debt: Money) -> Option<Settlement> {
    if order.status() == OrderStatus::Paid {
        return None;
    }

    let remaining_to_pay = order.remaining_balance();
    let (debt_reduction, new_debt) = clamp_debt(debt, remaining_to_pay);

    Some(Settlement {
        payment: remaining_to_pay,
        new_amount_paid: order.total,
        settles_order: true,
        previous_debt: debt,
        debt_reduction,
        new_debt,
    })
}

/// Checks a partial payment against the order's state, before the
/// customer is loaded.
///
/// ## Rules
/// - Order must not be paid → `OrderAlreadyPaid`
/// - `0 < amount ≤ remaining_balance` → otherwise `InvalidPaymentAmount`
pub fn check_partial_payment(order: &Order, amount: Money) -> CoreResult<()> {
    if order.status() == OrderStatus::Paid {
        return Err(CoreError::OrderAlreadyPaid(order.id.clone()));
    }

    let remaining = order.remaining_balance();
    if validate_payment_amount(amount).is_err() || amount > remaining {
        return Err(CoreError::InvalidPaymentAmount { amount, remaining });
    }

    Ok(())
}

/// Computes the settlement for a partial payment of `amount`.
///
/// ## Example
/// ```rust
/// # use chrono::Utc;
/// # use bazaar_core::money::Money;
/// # use bazaar_core::types::Order;
/// use bazaar_core::payment::apply_partial;
///
/// # let now = Utc::now();
/// # let order = Order {
/// #     id: "o-1".into(), customer_id: "c-1".into(), lines: vec![],
/// #     total: Money::from_cents(10000), amount_paid: Money::zero(),
/// #     profit: Money::from_cents(4000), created_at: now, updated_at: now, paid_at: None,
/// # };
/// let s = apply_partial(&order, Money::from_cents(10000), Money::from_cents(3000)).unwrap();
/// assert_eq!(s.new_amount_paid.cents(), 3000);
/// assert_eq!(s.new_debt.cents(), 7000);
/// assert!(!s.settles_order);
/// ```
pub fn apply_partial(order: &Order, debt: Money, amount: Money) -> CoreResult<Settlement> {
    check_partial_payment(order, amount)?;

    let new_amount_paid = order.amount_paid + amount;
    let settles_order = (order.total - new_amount_paid).is_zero();
    let (debt_reduction, new_debt) = clamp_debt(debt, amount);

    Ok(Settlement {
        payment: amount,
        new_amount_paid,
        settles_order,
        previous_debt: debt,
        debt_reduction,
        new_debt,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
