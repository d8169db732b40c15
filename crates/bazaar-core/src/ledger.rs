//! # Balance Ledger
//!
//! Append-only audit entries written alongside every balance mutation, and
//! the pure folds that replay them.
//!
//! ## Entry Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kind              amount                 debt_delta                    │
//! │  ───────────────   ────────────────────   ──────────────────────────    │
//! │  order_created     order total            +total                        │
//! │  payment_applied   payment on the order   −debt_reduction               │
//! │  order_reversed    order total            −total                        │
//! │  debt_adjusted     new debt               new − old                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The in-place balances stay authoritative. Replaying `debt_delta` for a
//! customer reproduces their stored debt exactly; comparing the stored debt
//! with the sum of their orders' remaining balances exposes drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Entry Types
// =============================================================================

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum LedgerEntryKind {
    OrderCreated,
    PaymentApplied,
    OrderReversed,
    DebtAdjusted,
}

impl LedgerEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryKind::OrderCreated => "order_created",
            LedgerEntryKind::PaymentApplied => "payment_applied",
            LedgerEntryKind::OrderReversed => "order_reversed",
            LedgerEntryKind::DebtAdjusted => "debt_adjusted",
        }
    }
}

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerEntry {
    /// Monotonic insertion order.
    pub sequence: i64,
    pub id: String,
    pub customer_id: String,
    pub order_id: Option<String>,
    pub kind: LedgerEntryKind,
    pub amount: Money,
    /// Signed change to the customer's debt.
    pub debt_delta: Money,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

/// An entry about to be appended. `sequence` and `recorded_at` are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub customer_id: String,
    pub order_id: Option<String>,
    pub kind: LedgerEntryKind,
    pub amount: Money,
    pub debt_delta: Money,
}

impl NewLedgerEntry {
    pub fn order_created(customer_id: &str, order_id: &str, total: Money) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            order_id: Some(order_id.to_string()),
            kind: LedgerEntryKind::OrderCreated,
            amount: total,
            debt_delta: total,
        }
    }

    pub fn payment_applied(
        customer_id: &str,
        order_id: &str,
        payment: Money,
        debt_reduction: Money,
    ) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            order_id: Some(order_id.to_string()),
            kind: LedgerEntryKind::PaymentApplied,
            amount: payment,
            debt_delta: Money::zero() - debt_reduction,
        }
    }

    pub fn order_reversed(customer_id: &str, order_id: &str, total: Money) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            order_id: Some(order_id.to_string()),
            kind: LedgerEntryKind::OrderReversed,
            amount: total,
            debt_delta: Money::zero() - total,
        }
    }

    pub fn debt_adjusted(customer_id: &str, previous: Money, new_debt: Money) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            order_id: None,
            kind: LedgerEntryKind::DebtAdjusted,
            amount: new_debt,
            debt_delta: new_debt - previous,
        }
    }
}

// =============================================================================
// Replay
// =============================================================================

/// Folds the debt deltas of `customer_id`'s entries.
///
/// Entries belonging to other customers are ignored.
pub fn replay_customer_debt(customer_id: &str, entries: &[LedgerEntry]) -> Money {
    entries
        .iter()
        .filter(|e| e.customer_id == customer_id)
        .map(|e| e.debt_delta)
        .sum()
}

/// Read-only comparison of a customer's balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BalanceAudit {
    pub customer_id: String,
    /// Debt as stored on the customer row.
    pub stored_debt: Money,
    /// Σ remaining balance over the customer's orders.
    pub outstanding_balance: Money,
    /// Debt reproduced from the ledger.
    pub ledger_debt: Money,
    /// stored_debt − outstanding_balance
    pub debt_drift: Money,
    /// stored_debt − ledger_debt
    pub ledger_drift: Money,
    pub is_consistent: bool,
}

impl BalanceAudit {
    pub fn new(
        customer_id: impl Into<String>,
        stored_debt: Money,
        outstanding_balance: Money,
        ledger_debt: Money,
    ) -> Self {
        let debt_drift = stored_debt - outstanding_balance;
        let ledger_drift = stored_debt - ledger_debt;

        Self {
            customer_id: customer_id.into(),
            stored_debt,
            outstanding_balance,
            ledger_debt,
            debt_drift,
            ledger_drift,
            is_consistent: debt_drift.is_zero() && ledger_drift.is_zero(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: i64, customer: &str, new: NewLedgerEntry) -> LedgerEntry {
        LedgerEntry {
            sequence: seq,
            id: format!("l-{seq}"),
            customer_id: customer.to_string(),
            order_id: new.order_id,
            kind: new.kind,
            amount: new.amount,
            debt_delta: new.debt_delta,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_replay_matches_in_place_debt() {
        let c = "c-1";
        let entries = vec![
            entry(1, c, NewLedgerEntry::debt_adjusted(c, Money::zero(), Money::from_cents(2000))),
            entry(2, c, NewLedgerEntry::order_created(c, "o-1", Money::from_cents(10000))),
            entry(3, c, NewLedgerEntry::payment_applied(c, "o-1", Money::from_cents(3000), Money::from_cents(3000))),
            entry(4, c, NewLedgerEntry::order_created(c, "o-2", Money::from_cents(500))),
            entry(5, c, NewLedgerEntry::order_reversed(c, "o-2", Money::from_cents(500))),
            entry(6, "c-2", NewLedgerEntry::order_created("c-2", "o-3", Money::from_cents(999))),
        ];

        assert_eq!(replay_customer_debt(c, &entries).cents(), 2000 + 10000 - 3000);
    }

    #[test]
    fn test_clamped_payment_records_actual_reduction() {
        let e = NewLedgerEntry::payment_applied("c-1", "o-1", Money::from_cents(8000), Money::from_cents(5000));
        assert_eq!(e.amount.cents(), 8000);
        assert_eq!(e.debt_delta.cents(), -5000);
    }

    #[test]
    fn test_audit_flags_debt_drift() {
        // Debt edited down to 10 while the order still has 100 outstanding
        let audit = BalanceAudit::new(
            "c-1",
            Money::from_cents(1000),
            Money::from_cents(10000),
            Money::from_cents(1000),
        );

        assert_eq!(audit.debt_drift.cents(), -9000);
        assert_eq!(audit.ledger_drift, Money::zero());
        assert!(!audit.is_consistent);
    }

    #[test]
    fn test_audit_consistent_when_all_agree() {
        let m = Money::from_cents(4200);
        assert!(BalanceAudit::new("c-1", m, m, m).is_consistent);
    }

    #[test]
    fn test_kind_names_match_storage() {
        assert_eq!(
            serde_json::to_string(&LedgerEntryKind::PaymentApplied).unwrap(),
            format!("\"{}\"", LedgerEntryKind::PaymentApplied.as_str())
        );
    }
}
