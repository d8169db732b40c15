//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  AppConfig::load() / DbConfig::new(path)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                            │
//! │  │            SqlitePool                   │                            │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐        │                            │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...    │  (max_connections)         │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘        │                            │
//! │  └─────────────────────────────────────────┘                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  create_order ──► BEGIN on Conn1 ... COMMIT                             │
//! │  apply_payment ─► BEGIN on Conn2 ... COMMIT  (SQLite serializes writers)│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so that report reads
//! never wait on an order transaction.

use chrono::{DateTime, TimeZone};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::category::CategoryRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::ledger::LedgerRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;
use bazaar_core::ledger::BalanceAudit;
use bazaar_core::report::{profit_report, ProfitReport};
use bazaar_core::{Money, TopProduct};

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/bazaar.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap (the pool is reference counted), so a handle can be
/// moved into each task.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./bazaar.db")).await?;
/// let order = db.orders().create_order(&request).await?;
/// let report = db.profit_report(&chrono::Local::now()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous
    ///    - Foreign keys enabled
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent: applied migrations are tracked in `_sqlx_migrations`.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the product repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Returns the category repository.
    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    /// Returns the customer repository.
    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    /// Returns the order repository (the Order Engine).
    ///
    /// ## Example
    /// ```rust,ignore
    /// let outcome = db.orders().mark_fully_paid(&order_id).await?;
    /// ```
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Returns the ledger repository.
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    /// Profit rollups for today, last week, last month and all time.
    ///
    /// ## Arguments
    /// * `now` - Reference instant. Its timezone decides where local
    ///   midnights and week/month boundaries fall.
    pub async fn profit_report<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DbResult<ProfitReport> {
        let summaries = self.orders().summaries().await?;
        debug!(orders = summaries.len(), "Building profit report");
        Ok(profit_report(&summaries, now))
    }

    /// Sum of every customer's debt.
    pub async fn total_debt(&self) -> DbResult<Money> {
        self.customers().total_debt().await
    }

    /// Best sellers by cumulative units sold.
    pub async fn top_products(&self, limit: u32) -> DbResult<Vec<TopProduct>> {
        self.products().top_products(limit).await
    }

    /// Checks one customer's debt against open balances and the ledger.
    pub async fn audit_customer(&self, customer_id: &str) -> DbResult<BalanceAudit> {
        self.ledger().audit_customer(customer_id).await
    }

    /// Audits every customer, returning only those that have drifted.
    pub async fn audit_all(&self) -> DbResult<Vec<BalanceAudit>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM customers ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        let ledger = self.ledger();
        let mut drifted = Vec::new();
        for id in ids {
            let audit = ledger.audit_customer(&id).await?;
            if !audit.is_consistent {
                drifted.push(audit);
            }
        }

        info!(drifted = drifted.len(), "Balance audit complete");
        Ok(drifted)
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::order::{OrderLineRequest, OrderRequest};
    use bazaar_core::NewProduct;
    use chrono::{Duration as ChronoDuration, FixedOffset, Utc};

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
        assert_eq!(db.total_debt().await.unwrap(), Money::zero());
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
    }

    #[tokio::test]
    async fn test_closed_database_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_dashboard_queries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .customers()
            .insert("Nour", "70111222", Money::from_cents(500))
            .await
            .unwrap();

        let mut ids = Vec::new();
        for (name, qty) in [("Jacket", 3), ("Cap", 1)] {
            let p = db
                .products()
                .insert(&NewProduct {
                    name: name.to_string(),
                    quantity: 10,
                    price: Money::from_cents(2000),
                    initial_price: Money::from_cents(1500),
                    gender: None,
                    category_id: None,
                    images: vec![],
                })
                .await
                .unwrap();
            db.orders()
                .create_order(&OrderRequest {
                    customer_id: customer.id.clone(),
                    lines: vec![OrderLineRequest {
                        product_id: p.id.clone(),
                        quantity: qty,
                        unit_price: p.price,
                    }],
                    total: None,
                })
                .await
                .unwrap();
            ids.push(p.id);
        }

        assert_eq!(db.total_debt().await.unwrap().cents(), 500 + 8000);

        let top = db.top_products(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, ids[0]);
        assert_eq!(top[0].nb_of_orders, 3);

        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let report = db.profit_report(&Utc::now().with_timezone(&offset)).await.unwrap();
        assert_eq!(report.today.total_all_orders, 2);
        assert_eq!(report.all_time.expected_profit.cents(), 2000);
        assert_eq!(report.all_time.pending_orders_count, 2);

        let tomorrow = Utc::now() + ChronoDuration::days(1);
        let report = db.profit_report(&tomorrow).await.unwrap();
        assert_eq!(report.today.total_all_orders, 0);
        assert_eq!(report.all_time.total_all_orders, 2);

        assert!(db.audit_all().await.unwrap().is_empty());
    }
}
