//! # bazaar-core: Pure Business Logic for the Bazaar Back-Office
//!
//! This crate holds the order/payment/debt reconciliation rules as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 CRUD / Dashboard shell (external)               │   │
//! │  │     forms, list pages, charts ── renders returned JSON          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 bazaar-db (Order Engine, stores)                │   │
//! │  │     one SQLite transaction per create / pay / delete            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  order  │ │ payment │ │ report  │ │ ledger  │  │   │
//! │  │   │ Product │ │  plan   │ │ settle  │ │ windows │ │ replay  │  │   │
//! │  │   │  Order  │ │ profit  │ │  clamp  │ │  fold   │ │  audit  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Category, Customer, Order, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types and machine-checkable error kinds
//! - [`validation`] - Input validation
//! - [`order`] - Order planning: stock checks, totals, profit
//! - [`payment`] - Full and partial payment settlement with debt clamping
//! - [`report`] - Time-windowed profit rollups
//! - [`ledger`] - Append-only audit entries and balance replay
//!
//! ## Example Usage
//!
//! ```rust
//! use bazaar_core::money::Money;
//!
//! // 30 paid out of 100 realizes 30% of a 40 profit
//! let profit = Money::from_cents(4000);
//! let realized = profit.split_by_ratio(Money::from_cents(3000), Money::from_cents(10000));
//! assert_eq!(realized.cents(), 1200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod order;
pub mod payment;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorClass, ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines allowed in a single order.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single product on one order line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Maximum unit price in cents ($100,000,000.00).
///
/// A full order at this price and quantity still fits in an `i64` of cents.
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000_000;
