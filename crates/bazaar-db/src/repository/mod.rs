//! # Repository Module
//!
//! Database repository implementations for Bazaar.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and the Order Engine                    │
//! │                                                                         │
//! │  Shell (form submit, dashboard)                                         │
//! │       │                                                                 │
//! │       │  db.orders().create_order(&request)                             │
//! │       ▼                                                                 │
//! │  OrderRepository ─── one transaction ──┬──► product::take_stock         │
//! │                                        ├──► customer::set_debt          │
//! │                                        └──► ledger::append              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  The helpers on the right take `&mut SqliteConnection`, so they join    │
//! │  whatever transaction the caller has open.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`category::CategoryRepository`] - Categories and product membership
//! - [`customer::CustomerRepository`] - Customers and debt
//! - [`ledger::LedgerRepository`] - Ledger reads and balance audits
//! - [`order::OrderRepository`] - Order Engine: create, pay, delete
//! - [`product::ProductRepository`] - Catalog, stock, best sellers

pub mod category;
pub mod customer;
pub mod ledger;
pub mod order;
pub mod product;
