//! # bazaar-db: Database Layer and Order Engine for Bazaar
//!
//! This crate owns every write to the store. It uses SQLite through sqlx,
//! and runs each order operation in a single transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Data Flow                                 │
//! │                                                                         │
//! │  Shell action (create order, record payment, open dashboard)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bazaar-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │    │   │
//! │  │   │               │    │ OrderRepo     │    │              │    │   │
//! │  │   │ SqlitePool    │◄───│ CustomerRepo  │    │ 001_initial  │    │   │
//! │  │   │ Reports       │    │ ProductRepo   │    │   _schema    │    │   │
//! │  │   │ Audits        │    │ LedgerRepo    │    │              │    │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (BAZAAR_DB_PATH)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and the [`Database`] handle
//! - [`config`] - Environment-driven configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories, including the Order Engine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bazaar_db::{AppConfig, Database};
//!
//! let config = AppConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let order = db.orders().create_order(&request).await?;
//! db.orders().apply_partial_payment(&order.id, Money::from_cents(3000)).await?;
//!
//! let report = db.profit_report(&chrono::Local::now()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult, ErrorReport};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::customer::CustomerRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
