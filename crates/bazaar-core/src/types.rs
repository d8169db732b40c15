//! # Domain Types
//!
//! Core domain types used throughout the back-office.
//!
//! ## Type Graph
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │    Product      │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  category_id    │   │  id             │       │
//! │  │  name (unique)  │   │  quantity ≥ 0   │   │  phone (unique) │       │
//! │  │  product_ids    │   │  price / cost   │   │  debt           │       │
//! │  └─────────────────┘   │  nb_of_orders   │   │  order_ids      │       │
//! │                        └────────▲────────┘   └────────▲────────┘       │
//! │                                 │ snapshot            │                 │
//! │                        ┌────────┴─────────────────────┴──────┐          │
//! │                        │               Order                 │          │
//! │                        │  lines (name/price/cost frozen)     │          │
//! │                        │  total, amount_paid, profit         │          │
//! │                        │  remaining_balance() ── derived     │          │
//! │                        │  status()           ── derived      │          │
//! │                        └─────────────────────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Gender
// =============================================================================

/// Optional audience tag on a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Gender {
    Male,
    Female,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, copied onto order lines at sale time.
    pub name: String,

    /// Units in stock. Never negative.
    pub quantity: i64,

    /// Catalog sale price.
    pub price: Money,

    /// Cost price used for profit calculation.
    pub initial_price: Money,

    /// Cumulative units sold. Rises on order creation, falls only on rollback.
    pub nb_of_orders: i64,

    /// Owning category, if any.
    pub category_id: Option<String>,

    pub gender: Option<Gender>,

    /// Image URLs (uploading is handled by the shell).
    pub images: Vec<String>,

    /// Whether the product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Profit earned on one unit sold at the catalog price.
    #[inline]
    pub fn profit_per_unit(&self) -> Money {
        self.price - self.initial_price
    }

    /// Checks if `quantity` units can be taken from stock.
    #[inline]
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.is_active && self.quantity >= quantity
    }
}

/// Input for adding a product to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub quantity: i64,
    pub price: Money,
    pub initial_price: Money,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

// =============================================================================
// Category
// =============================================================================

/// A grouping of products. Holds back-references only, not ownership.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    /// Active products in this category, oldest first.
    pub product_ids: Vec<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer and their outstanding debt.
///
/// ## Central Invariant
/// `debt` is expected to equal the sum of `remaining_balance` over the
/// customer's outstanding orders. Debt reductions are clamped at zero, and
/// manual edits can break the equality; see [`crate::ledger::BalanceAudit`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub full_name: String,
    pub phone_number: String,
    pub debt: Money,
    /// Orders placed by this customer, oldest first.
    pub order_ids: Vec<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// Payment status of an order. Never stored; always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum OrderStatus {
    /// No payment recorded.
    Pending,
    /// Some, but not all, of the total has been paid.
    PartiallyPaid,
    /// Remaining balance is zero.
    Paid,
}

impl OrderStatus {
    /// Derives the status from an order's balances.
    ///
    /// ## Rules
    /// ```text
    /// amount_paid == 0 and never settled  → Pending
    /// total − amount_paid == 0            → Paid
    /// anything else                       → PartiallyPaid
    /// ```
    /// `settled` distinguishes a zero-total order that was marked paid
    /// from one that is still pending.
    pub fn derive(total: Money, amount_paid: Money, settled: bool) -> Self {
        if amount_paid.is_zero() && !settled {
            OrderStatus::Pending
        } else if (total - amount_paid).is_zero() {
            OrderStatus::Paid
        } else {
            OrderStatus::PartiallyPaid
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PartiallyPaid => "partiallyPaid",
            OrderStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// A line item on an order.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLine {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    pub quantity: i64,
    /// Sale price per unit (frozen, may differ from catalog price).
    pub unit_price: Money,
    /// Catalog cost price per unit at time of sale (frozen).
    pub cost_price: Money,
}

impl OrderLine {
    /// `unit_price × quantity`
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// `(unit_price − cost_price) × quantity`
    #[inline]
    pub fn line_profit(&self) -> Money {
        (self.unit_price - self.cost_price).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order.
///
/// Only `total`, `amount_paid` and `paid_at` are persisted balances.
/// `remaining_balance()` and `status()` are computed on read, so
/// `remaining_balance + amount_paid == total` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "OrderDocument")]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub amount_paid: Money,
    /// Computed once at creation from the frozen line prices.
    pub profit: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the remaining balance reaches zero.
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// `total − amount_paid`
    #[inline]
    pub fn remaining_balance(&self) -> Money {
        self.total - self.amount_paid
    }

    #[inline]
    pub fn status(&self) -> OrderStatus {
        OrderStatus::derive(self.total, self.amount_paid, self.paid_at.is_some())
    }

    /// Only pending orders may be rolled back.
    #[inline]
    pub fn is_deletable(&self) -> bool {
        self.status() == OrderStatus::Pending
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// JSON shape of an [`Order`], including the derived fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderDocument {
    pub id: String,
    pub customer_id: String,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub amount_paid: Money,
    pub remaining_balance: Money,
    pub status: OrderStatus,
    pub profit: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderDocument {
    fn from(order: Order) -> Self {
        OrderDocument {
            remaining_balance: order.remaining_balance(),
            status: order.status(),
            id: order.id,
            customer_id: order.customer_id,
            lines: order.lines,
            total: order.total,
            amount_paid: order.amount_paid,
            profit: order.profit,
            created_at: order.created_at,
            updated_at: order.updated_at,
            paid_at: order.paid_at,
        }
    }
}

// =============================================================================
// Payment Outcome
// =============================================================================

/// Result of applying a payment to an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    /// The order after the payment.
    pub order: Order,
    /// Amount applied to the order in this call.
    pub amount_applied: Money,
    /// Amount actually taken off the customer's debt.
    pub debt_reduction: Money,
    pub previous_debt: Money,
    pub new_debt: Money,
    /// `true` when the order was already paid and nothing changed.
    pub already_paid: bool,
}

// =============================================================================
// Dashboard Types
// =============================================================================

/// A best-selling product, ranked by `nb_of_orders`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TopProduct {
    pub id: String,
    pub name: String,
    pub nb_of_orders: i64,
    pub price: Money,
    pub quantity: i64,
    pub image: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn order(total: i64, paid: i64, settled: bool) -> Order {
        let now = Utc::now();
        Order {
            id: "o-1".to_string(),
            customer_id: "c-1".to_string(),
            lines: vec![],
            total: Money::from_cents(total),
            amount_paid: Money::from_cents(paid),
            profit: Money::zero(),
            created_at: now,
            updated_at: now,
            paid_at: settled.then_some(now),
        }
    }

    #[test]
    fn test_status_is_derived_from_balances() {
        assert_eq!(order(10000, 0, false).status(), OrderStatus::Pending);
        assert_eq!(order(10000, 3000, false).status(), OrderStatus::PartiallyPaid);
        assert_eq!(order(10000, 10000, true).status(), OrderStatus::Paid);
    }

    #[test]
    fn test_zero_total_order_pending_until_settled() {
        assert_eq!(order(0, 0, false).status(), OrderStatus::Pending);
        assert_eq!(order(0, 0, true).status(), OrderStatus::Paid);
    }

    #[test]
    fn test_remaining_plus_paid_equals_total() {
        let o = order(10000, 3000, false);
        assert_eq!(o.remaining_balance() + o.amount_paid, o.total);
    }

    #[test]
    fn test_only_pending_is_deletable() {
        assert!(order(10000, 0, false).is_deletable());
        assert!(!order(10000, 1, false).is_deletable());
        assert!(!order(10000, 10000, true).is_deletable());
    }

    #[test]
    fn test_line_profit_uses_frozen_prices() {
        let line = OrderLine {
            product_id: "p-1".to_string(),
            name: "Linen Shirt".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(5000),
            cost_price: Money::from_cents(3000),
        };
        assert_eq!(line.line_total().cents(), 10000);
        assert_eq!(line.line_profit().cents(), 4000);
    }

    #[test]
    fn test_order_serializes_derived_fields() {
        let json = serde_json::to_value(order(10000, 3000, false)).unwrap();
        assert_eq!(json["status"], "partiallyPaid");
        assert_eq!(json["remainingBalance"], 7000);
        assert_eq!(json["amountPaid"], 3000);
    }
}
