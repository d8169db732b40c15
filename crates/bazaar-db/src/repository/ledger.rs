//! # Ledger Repository
//!
//! Append-only record of every debt-affecting mutation.
//!
//! ## Same-Transaction Append
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  1. UPDATE orders / products / customers ...                            │
//! │  2. INSERT INTO ledger_entries (kind, amount, debt_delta)               │
//! │                                                                         │
//! │  COMMIT ← the balance change and its entry land together or not at all  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::customer::fetch_debt;
use bazaar_core::ledger::{
    replay_customer_debt, BalanceAudit, LedgerEntry, LedgerEntryKind, NewLedgerEntry,
};
use bazaar_core::{CoreError, Money};

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    sequence: i64,
    id: String,
    customer_id: String,
    order_id: Option<String>,
    kind: LedgerEntryKind,
    amount_cents: Money,
    debt_delta_cents: Money,
    recorded_at: DateTime<Utc>,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        LedgerEntry {
            sequence: row.sequence,
            id: row.id,
            customer_id: row.customer_id,
            order_id: row.order_id,
            kind: row.kind,
            amount: row.amount_cents,
            debt_delta: row.debt_delta_cents,
            recorded_at: row.recorded_at,
        }
    }
}

/// Repository for reading the ledger and auditing balances.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// All entries for a customer, in insertion order.
    pub async fn for_customer(&self, customer_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        entries_for(&mut conn, customer_id).await
    }

    /// All entries touching one order, in insertion order.
    pub async fn for_order(&self, order_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT sequence, id, customer_id, order_id, kind,
                   amount_cents, debt_delta_cents, recorded_at
            FROM ledger_entries
            WHERE order_id = ?1
            ORDER BY sequence
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }

    /// Compares a customer's stored debt with their orders and the ledger.
    ///
    /// Read-only.
    pub async fn audit_customer(&self, customer_id: &str) -> DbResult<BalanceAudit> {
        let mut conn = self.pool.acquire().await?;

        let stored_debt = fetch_debt(&mut conn, customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        let outstanding: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_cents - amount_paid_cents), 0)
            FROM orders
            WHERE customer_id = ?1
            "#,
        )
        .bind(customer_id)
        .fetch_one(&mut *conn)
        .await?;

        let entries = entries_for(&mut conn, customer_id).await?;
        let ledger_debt = replay_customer_debt(customer_id, &entries);

        let audit = BalanceAudit::new(
            customer_id,
            stored_debt,
            Money::from_cents(outstanding),
            ledger_debt,
        );

        if audit.is_consistent {
            debug!(customer_id = %customer_id, "Balances consistent");
        } else {
            warn!(
                customer_id = %customer_id,
                debt_drift = %audit.debt_drift,
                ledger_drift = %audit.ledger_drift,
                "Customer balances have drifted"
            );
        }

        Ok(audit)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Appends an entry on an open transaction.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    entry: &NewLedgerEntry,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(
        customer_id = %entry.customer_id,
        kind = entry.kind.as_str(),
        debt_delta = %entry.debt_delta,
        "Appending ledger entry"
    );

    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            id, customer_id, order_id, kind, amount_cents, debt_delta_cents, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&entry.customer_id)
    .bind(&entry.order_id)
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(entry.debt_delta)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn entries_for(conn: &mut SqliteConnection, customer_id: &str) -> DbResult<Vec<LedgerEntry>> {
    let rows: Vec<LedgerRow> = sqlx::query_as(
        r#"
        SELECT sequence, id, customer_id, order_id, kind,
               amount_cents, debt_delta_cents, recorded_at
        FROM ledger_entries
        WHERE customer_id = ?1
        ORDER BY sequence
        "#,
    )
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(LedgerEntry::from).collect())
}
