//! # Order Repository (Order Engine)
//!
//! Creates, reverses and settles orders. Each operation is ONE SQLite
//! transaction spanning the order, its products, the customer and the
//! ledger.
//!
//! ## Operation Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  create_order()                                                         │
//! │    stock −qty, nb_of_orders +qty, debt +total   → pending               │
//! │         │                                                               │
//! │         ├── apply_partial_payment(a) → partiallyPaid ─┐                 │
//! │         │                                              │                 │
//! │         ├── mark_fully_paid() ──────────────────────► paid              │
//! │         │                                                               │
//! │         └── delete_order()  (pending only)                              │
//! │               stock +qty, nb_of_orders −qty, debt −total, row removed   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Shape
//! ```text
//! BEGIN IMMEDIATE                                 ← write lock taken up front
//!   read + validate (order, products, customer)   ← any error: nothing written
//!   conditional writes                            ← 0 rows: error, rollback
//!   ledger append
//! COMMIT
//! ```
//! All reads and writes go through the transaction's connection. Dropping
//! the transaction without committing rolls everything back. Concurrent
//! writers queue on the busy timeout instead of failing on lock upgrade.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::customer::{fetch_debt, set_debt};
use crate::repository::ledger;
use crate::repository::product::{fetch_product, return_stock, take_stock};
use bazaar_core::ledger::NewLedgerEntry;
use bazaar_core::order::{ensure_deletable, plan_order, rollback_moves, OrderRequest};
use bazaar_core::payment::{apply_partial, check_partial_payment, settle_in_full, Settlement};
use bazaar_core::report::OrderSummary;
use bazaar_core::{
    CoreError, Money, Order, OrderLine, PaymentOutcome, Product, ValidationError,
};

const ORDER_COLUMNS: &str = r#"
    id, customer_id, total_cents, amount_paid_cents, profit_cents,
    created_at, updated_at, paid_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_id: String,
    total_cents: Money,
    amount_paid_cents: Money,
    profit_cents: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Order {
        Order {
            id: self.id,
            customer_id: self.customer_id,
            lines,
            total: self.total_cents,
            amount_paid: self.amount_paid_cents,
            profit: self.profit_cents,
            created_at: self.created_at,
            updated_at: self.updated_at,
            paid_at: self.paid_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    product_id: String,
    name_snapshot: String,
    quantity: i64,
    unit_price_cents: Money,
    cost_price_cents: Money,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            product_id: row.product_id,
            name: row.name_snapshot,
            quantity: row.quantity,
            unit_price: row.unit_price_cents,
            cost_price: row.cost_price_cents,
        }
    }
}

/// Repository for orders and the operations that move balances.
///
/// ## Usage
/// ```rust,ignore
/// let order = db.orders().create_order(&request).await?;
/// let outcome = db.orders().apply_partial_payment(&order.id, Money::from_cents(3000)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id).await
    }

    /// A customer's orders, oldest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?1 ORDER BY created_at, rowid"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = fetch_lines(&mut conn, &row.id).await?;
            orders.push(row.into_order(lines));
        }

        Ok(orders)
    }

    /// Every order, reduced to what the profit report needs.
    pub async fn summaries(&self) -> DbResult<Vec<OrderSummary>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at, rowid");
        let rows: Vec<OrderRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| OrderSummary {
                id: row.id,
                total: row.total_cents,
                amount_paid: row.amount_paid_cents,
                profit: row.profit_cents,
                created_at: row.created_at,
                paid_at: row.paid_at,
            })
            .collect())
    }

    /// Counts orders (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Places an order.
    ///
    /// ## What This Does
    /// 1. Loads the customer and every referenced product
    /// 2. Validates and prices the order (see [`plan_order`])
    /// 3. Takes stock per product with a conditional update
    /// 4. Inserts the order and its line snapshots
    /// 5. Adds the total to the customer's debt and logs it
    ///
    /// ## Errors
    /// `CustomerNotFound`, `ProductNotFound`, `InvalidPrice`,
    /// `InsufficientStock`, `EmptyOrder`, `Validation`. Nothing is written
    /// when any of them is returned.
    pub async fn create_order(&self, request: &OrderRequest) -> DbResult<Order> {
        debug!(
            customer_id = %request.customer_id,
            lines = request.lines.len(),
            "Creating order"
        );

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let debt = fetch_debt(&mut tx, &request.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(request.customer_id.clone()))?;

        let mut catalog: HashMap<String, Product> = HashMap::new();
        for line in &request.lines {
            if catalog.contains_key(&line.product_id) {
                continue;
            }
            if let Some(product) = fetch_product(&mut tx, &line.product_id).await? {
                catalog.insert(product.id.clone(), product);
            }
        }

        let plan = plan_order(request, &catalog)?;
        let new_debt = debt.checked_add(plan.total).ok_or_else(|| {
            CoreError::from(ValidationError::OutOfRange {
                field: "debt".to_string(),
                min: 0,
                max: i64::MAX,
            })
        })?;

        // ---- first write ----
        let now = Utc::now();

        for stock_move in &plan.stock_moves {
            if !take_stock(&mut tx, &stock_move.product_id, stock_move.quantity, now).await? {
                let current = fetch_product(&mut tx, &stock_move.product_id).await?;
                return Err(match current {
                    Some(p) if p.is_active => CoreError::InsufficientStock {
                        product: p.name,
                        available: p.quantity,
                        requested: stock_move.quantity,
                    },
                    _ => CoreError::ProductNotFound(stock_move.product_id.clone()),
                }
                .into());
            }
        }

        let order = Order {
            id: generate_order_id(),
            customer_id: request.customer_id.clone(),
            lines: plan.lines,
            total: plan.total,
            amount_paid: Money::zero(),
            profit: plan.profit,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };

        insert_order(&mut tx, &order).await?;
        set_debt(&mut tx, &order.customer_id, new_debt, now).await?;
        ledger::append(
            &mut tx,
            &NewLedgerEntry::order_created(&order.customer_id, &order.id, order.total),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            id = %order.id,
            customer_id = %order.customer_id,
            total = %order.total,
            profit = %order.profit,
            "Order created"
        );

        Ok(order)
    }

    // =========================================================================
    // Delete (rollback)
    // =========================================================================

    /// Reverses a pending order.
    ///
    /// Restores stock and `nb_of_orders` per line, takes the total off the
    /// customer's debt and removes the order. Returns the removed order.
    ///
    /// ## Errors
    /// `OrderNotFound`, `OrderNotDeletable` (partially paid or paid).
    pub async fn delete_order(&self, id: &str) -> DbResult<Order> {
        debug!(id = %id, "Deleting order");

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let order = fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        ensure_deletable(&order)?;

        let debt = fetch_debt(&mut tx, &order.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(order.customer_id.clone()))?;
        let new_debt = debt.checked_sub(order.total).ok_or_else(|| {
            CoreError::from(ValidationError::OutOfRange {
                field: "debt".to_string(),
                min: i64::MIN,
                max: i64::MAX,
            })
        })?;

        // ---- first write ----
        let now = Utc::now();

        let removed = sqlx::query(
            r#"
            DELETE FROM orders
            WHERE id = ?1 AND amount_paid_cents = 0 AND paid_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if removed.rows_affected() == 0 {
            return Err(CoreError::OrderNotDeletable {
                order_id: id.to_string(),
                status: order.status(),
            }
            .into());
        }

        sqlx::query("DELETE FROM order_lines WHERE order_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for stock_move in rollback_moves(&order) {
            return_stock(&mut tx, &stock_move.product_id, stock_move.quantity, now).await?;
        }

        set_debt(&mut tx, &order.customer_id, new_debt, now).await?;
        ledger::append(
            &mut tx,
            &NewLedgerEntry::order_reversed(&order.customer_id, &order.id, order.total),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, customer_id = %order.customer_id, total = %order.total, "Order reversed");

        Ok(order)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Settles the whole remaining balance.
    ///
    /// Marking an already-paid order succeeds without writing and reports
    /// `already_paid = true`.
    ///
    /// ## Errors
    /// `OrderNotFound`, `CustomerNotFound`.
    pub async fn mark_fully_paid(&self, id: &str) -> DbResult<PaymentOutcome> {
        debug!(id = %id, "Marking order fully paid");

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let order = fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        let debt = fetch_debt(&mut tx, &order.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(order.customer_id.clone()))?;

        let Some(settlement) = settle_in_full(&order, debt) else {
            debug!(id = %id, "Order already paid, nothing to do");
            return Ok(PaymentOutcome {
                order,
                amount_applied: Money::zero(),
                debt_reduction: Money::zero(),
                previous_debt: debt,
                new_debt: debt,
                already_paid: true,
            });
        };

        let outcome = apply_settlement(&mut tx, order, &settlement).await?;
        tx.commit().await?;

        info!(
            id = %id,
            paid = %outcome.amount_applied,
            new_debt = %outcome.new_debt,
            "Order paid in full"
        );

        Ok(outcome)
    }

    /// Applies a payment of `amount` to an order.
    ///
    /// ## Errors
    /// `OrderNotFound`, `OrderAlreadyPaid`, `InvalidPaymentAmount`
    /// (`amount ≤ 0` or more than the remaining balance), `CustomerNotFound`.
    pub async fn apply_partial_payment(&self, id: &str, amount: Money) -> DbResult<PaymentOutcome> {
        debug!(id = %id, amount = %amount, "Applying partial payment");

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let order = fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        check_partial_payment(&order, amount)?;

        let debt = fetch_debt(&mut tx, &order.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(order.customer_id.clone()))?;

        let settlement = apply_partial(&order, debt, amount)?;
        let outcome = apply_settlement(&mut tx, order, &settlement).await?;
        tx.commit().await?;

        info!(
            id = %id,
            paid = %amount,
            status = %outcome.order.status(),
            new_debt = %outcome.new_debt,
            "Payment applied"
        );

        Ok(outcome)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn fetch_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");

    let row: Option<OrderRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let lines = fetch_lines(conn, id).await?;
    Ok(Some(row.into_order(lines)))
}

async fn fetch_lines(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderLine>> {
    let rows: Vec<OrderLineRow> = sqlx::query_as(
        r#"
        SELECT product_id, name_snapshot, quantity, unit_price_cents, cost_price_cents
        FROM order_lines
        WHERE order_id = ?1
        ORDER BY position
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(OrderLine::from).collect())
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, customer_id, total_cents, amount_paid_cents, profit_cents,
            created_at, updated_at, paid_at
        ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5, NULL)
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_id)
    .bind(order.total)
    .bind(order.profit)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;

    for (position, line) in order.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_lines (
                order_id, position, product_id, name_snapshot,
                quantity, unit_price_cents, cost_price_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&order.id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(&line.name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.cost_price)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Writes a settlement: order balance, customer debt, ledger entry.
///
/// The order update is guarded on the amount paid that was read, so a
/// concurrent payment cannot be overwritten.
async fn apply_settlement(
    conn: &mut SqliteConnection,
    mut order: Order,
    settlement: &Settlement,
) -> DbResult<PaymentOutcome> {
    let now = Utc::now();
    let paid_at = if settlement.settles_order {
        Some(now)
    } else {
        order.paid_at
    };

    let updated = sqlx::query(
        r#"
        UPDATE orders
        SET amount_paid_cents = ?2, paid_at = ?3, updated_at = ?4
        WHERE id = ?1 AND amount_paid_cents = ?5 AND paid_at IS NULL
        "#,
    )
    .bind(&order.id)
    .bind(settlement.new_amount_paid)
    .bind(paid_at)
    .bind(now)
    .bind(order.amount_paid)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(DbError::TransactionFailed(format!(
            "order {} changed while being paid",
            order.id
        )));
    }

    if settlement.debt_clamped() {
        warn!(
            order_id = %order.id,
            payment = %settlement.payment,
            debt = %settlement.previous_debt,
            "Debt smaller than payment, clamped at zero"
        );
    }
    if settlement.debt_was_negative() {
        warn!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            payment = %settlement.payment,
            debt = %settlement.previous_debt,
            "Stored debt was already negative, reset to zero"
        );
    }

    set_debt(conn, &order.customer_id, settlement.new_debt, now).await?;
    ledger::append(
        conn,
        &NewLedgerEntry::payment_applied(
            &order.customer_id,
            &order.id,
            settlement.payment,
            settlement.debt_reduction,
        ),
        now,
    )
    .await?;

    order.amount_paid = settlement.new_amount_paid;
    order.paid_at = paid_at;
    order.updated_at = now;

    Ok(PaymentOutcome {
        order,
        amount_applied: settlement.payment,
        debt_reduction: settlement.debt_reduction,
        previous_debt: settlement.previous_debt,
        new_debt: settlement.new_debt,
        already_paid: false,
    })
}

/// Generates a new order ID.
pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
