//! # Order Planning
//!
//! Pure validation and computation for order creation and rollback. The
//! database layer loads the catalog rows, calls [`plan_order`], and only then
//! issues writes.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderRequest { customer_id, lines[], total? }                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_order(request, catalog) ← THIS MODULE                             │
//! │       │                                                                 │
//! │       ├── line product missing/inactive? → ProductNotFound              │
//! │       ├── unit price < 0 or too large?   → InvalidPrice                 │
//! │       ├── quantity out of range?         → Validation                   │
//! │       ├── Σ qty per product > stock?     → InsufficientStock            │
//! │       ├── declared total ≠ Σ lines?      → Validation                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderPlan { lines (snapshots), total, profit, stock_moves }            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  bazaar-db applies stock_moves + debt + insert in ONE transaction       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Order, OrderLine, Product};
use crate::validation::{validate_order_size, validate_quantity};
use crate::MAX_UNIT_PRICE_CENTS;

// =============================================================================
// Request Types
// =============================================================================

/// One requested line: which product, how many, at what sale price.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
    /// Submitted sale price; callers may override the catalog price.
    pub unit_price: Money,
}

/// Input to order creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderRequest {
    pub customer_id: String,
    pub lines: Vec<OrderLineRequest>,
    /// Declared total. When present it must equal the sum of the lines.
    #[serde(default)]
    pub total: Option<Money>,
}

// =============================================================================
// Plan
// =============================================================================

/// Net stock change for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMove {
    pub product_id: String,
    pub quantity: i64,
}

/// A fully validated order, ready to be written.
#[derive(Debug, Clone)]
pub struct OrderPlan {
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub profit: Money,
    /// One entry per distinct product, in first-seen order.
    pub stock_moves: Vec<StockMove>,
}

/// Validates a request against the current catalog and computes the order.
///
/// ## Profit
/// Per line: `(unit_price − product.initial_price) × quantity`, using the
/// submitted sale price and the *current* catalog cost.
///
/// ## Stock
/// Quantities are summed per product before comparing with stock, so two
/// lines of the same product cannot each pass the check on their own.
///
/// ## Example
/// ```rust
/// use std::collections::HashMap;
/// use chrono::Utc;
/// use bazaar_core::money::Money;
/// use bazaar_core::order::{plan_order, OrderLineRequest, OrderRequest};
/// use bazaar_core::types::Product;
///
/// let now = Utc::now();
/// let product = Product {
///     id: "p-1".into(), name: "Linen Shirt".into(), quantity: 10,
///     price: Money::from_cents(10000), initial_price: Money::from_cents(6000),
///     nb_of_orders: 0, category_id: None, gender: None, images: vec![],
///     is_active: true, created_at: now, updated_at: now,
/// };
/// let catalog = HashMap::from([(product.id.clone(), product)]);
///
/// let request = OrderRequest {
///     customer_id: "c-1".into(),
///     lines: vec![OrderLineRequest {
///         product_id: "p-1".into(), quantity: 1, unit_price: Money::from_cents(10000),
///     }],
///     total: Some(Money::from_cents(10000)),
/// };
///
/// let plan = plan_order(&request, &catalog).unwrap();
/// assert_eq!(plan.profit.cents(), 4000);
/// ```
pub fn plan_order(
    request: &OrderRequest,
    catalog: &HashMap<String, Product>,
) -> CoreResult<OrderPlan> {
    if request.lines.is_empty() {
        return Err(CoreError::EmptyOrder);
    }
    validate_order_size(request.lines.len())?;

    let mut lines = Vec::with_capacity(request.lines.len());
    let mut stock_moves: Vec<StockMove> = Vec::new();
    let mut total = Money::zero();
    let mut profit = Money::zero();

    for line in &request.lines {
        let product = catalog
            .get(&line.product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        let invalid_price = || CoreError::InvalidPrice {
            product: product.name.clone(),
            price: line.unit_price,
        };

        if line.unit_price.is_negative() || line.unit_price.cents() > MAX_UNIT_PRICE_CENTS {
            return Err(invalid_price());
        }

        validate_quantity(line.quantity)?;

        let requested = match stock_moves
            .iter_mut()
            .find(|m| m.product_id == line.product_id)
        {
            Some(existing) => {
                existing.quantity += line.quantity;
                existing.quantity
            }
            None => {
                stock_moves.push(StockMove {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                });
                line.quantity
            }
        };

        if !product.can_fulfil(requested) {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.quantity,
                requested,
            });
        }

        let order_line = OrderLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            cost_price: product.initial_price,
        };

        let line_total = line
            .unit_price
            .checked_multiply_quantity(line.quantity)
            .ok_or_else(invalid_price)?;
        let line_profit = line
            .unit_price
            .checked_sub(product.initial_price)
            .and_then(|margin| margin.checked_multiply_quantity(line.quantity))
            .ok_or_else(invalid_price)?;
        total = total.checked_add(line_total).ok_or_else(invalid_price)?;
        profit = profit.checked_add(line_profit).ok_or_else(invalid_price)?;
        lines.push(order_line);
    }

    if let Some(declared) = request.total {
        if declared != total {
            return Err(ValidationError::InvalidFormat {
                field: "total".to_string(),
                reason: format!("declared {} but lines sum to {}", declared, total),
            }
            .into());
        }
    }

    Ok(OrderPlan {
        lines,
        total,
        profit,
        stock_moves,
    })
}

/// Stock to hand back when a pending order is rolled back, one entry per
/// distinct product.
pub fn rollback_moves(order: &Order) -> Vec<StockMove> {
    let mut moves: Vec<StockMove> = Vec::new();
    for line in &order.lines {
        match moves.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => moves.push(StockMove {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            }),
        }
    }
    moves
}

/// Rejects rollback of any order that has recorded a payment.
pub fn ensure_deletable(order: &Order) -> CoreResult<()> {
    if !order.is_deletable() {
        return Err(CoreError::OrderNotDeletable {
            order_id: order.id.clone(),
            status: order.status(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
