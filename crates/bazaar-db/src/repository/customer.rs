//! # Customer Repository
//!
//! Customers and their outstanding debt.
//!
//! Debt moves with orders (create adds the total, payments and reversals
//! subtract) and with manual edits through [`CustomerRepository::adjust_debt`].
//! Every change is mirrored in the ledger.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger;
use bazaar_core::ledger::NewLedgerEntry;
use bazaar_core::validation::{validate_debt, validate_full_name, validate_phone_number};
use bazaar_core::{CoreError, Customer, Money};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    full_name: String,
    phone_number: String,
    debt_cents: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_customer(self, order_ids: Vec<String>) -> Customer {
        Customer {
            id: self.id,
            full_name: self.full_name,
            phone_number: self.phone_number,
            debt: self.debt_cents,
            order_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Registers a customer with an opening debt.
    ///
    /// ## Errors
    /// * `Validation` - empty name, malformed phone, negative debt
    /// * `DuplicatePhoneNumber` - phone already registered
    pub async fn insert(
        &self,
        full_name: &str,
        phone_number: &str,
        opening_debt: Money,
    ) -> DbResult<Customer> {
        validate_full_name(full_name).map_err(CoreError::from)?;
        validate_phone_number(phone_number).map_err(CoreError::from)?;
        validate_debt(opening_debt).map_err(CoreError::from)?;

        let full_name = full_name.trim();
        let phone_number = phone_number.trim();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, phone_number = %phone_number, "Inserting customer");

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO customers (id, full_name, phone_number, debt_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&id)
        .bind(full_name)
        .bind(phone_number)
        .bind(opening_debt)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            return Err(match DbError::from(e) {
                DbError::UniqueViolation { .. } => {
                    CoreError::DuplicatePhoneNumber(phone_number.to_string()).into()
                }
                other => other,
            });
        }

        if !opening_debt.is_zero() {
            let entry = NewLedgerEntry::debt_adjusted(&id, Money::zero(), opening_debt);
            ledger::append(&mut tx, &entry, now).await?;
        }

        tx.commit().await?;

        info!(id = %id, debt = %opening_debt, "Customer registered");

        Ok(Customer {
            id,
            full_name: full_name.to_string(),
            phone_number: phone_number.to_string(),
            debt: opening_debt,
            order_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a customer with their order ids, oldest first.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;

        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, full_name, phone_number, debt_cents, created_at, updated_at
            FROM customers WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let order_ids = order_ids_for(&mut conn, id).await?;
        Ok(Some(row.into_customer(order_ids)))
    }

    /// Lists customers by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, full_name, phone_number, debt_cents, created_at, updated_at
            FROM customers ORDER BY full_name, rowid
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut customers = Vec::with_capacity(rows.len());
        for row in rows {
            let order_ids = order_ids_for(&mut conn, &row.id).await?;
            customers.push(row.into_customer(order_ids));
        }

        Ok(customers)
    }

    /// Sum of all customers' debt.
    pub async fn total_debt(&self) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(debt_cents), 0) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(Money::from_cents(total))
    }

    /// Overwrites a customer's debt.
    ///
    /// Order balances are left alone, so this is where debt and
    /// remaining balances can start to disagree.
    pub async fn adjust_debt(&self, id: &str, new_debt: Money) -> DbResult<Customer> {
        validate_debt(new_debt).map_err(CoreError::from)?;

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let previous = fetch_debt(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()))?;

        let now = Utc::now();
        set_debt(&mut tx, id, new_debt, now).await?;
        ledger::append(&mut tx, &NewLedgerEntry::debt_adjusted(id, previous, new_debt), now).await?;

        tx.commit().await?;

        info!(id = %id, previous = %previous, new_debt = %new_debt, "Debt adjusted");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads a customer's debt on an open connection or transaction.
pub(crate) async fn fetch_debt(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Money>> {
    let debt: Option<Money> = sqlx::query_scalar("SELECT debt_cents FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(debt)
}

pub(crate) async fn set_debt(
    conn: &mut SqliteConnection,
    id: &str,
    debt: Money,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE customers SET debt_cents = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(debt)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::CustomerNotFound(id.to_string()).into());
    }

    Ok(())
}

async fn order_ids_for(conn: &mut SqliteConnection, customer_id: &str) -> DbResult<Vec<String>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT id FROM orders WHERE customer_id = ?1 ORDER BY created_at, rowid",
    )
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use bazaar_core::ledger::LedgerEntryKind;
    use bazaar_core::{CoreError, Money};

    #[tokio::test]
    async fn test_insert_and_fetch_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let c = db
            .customers()
            .insert("Rima Haddad", "70123456", Money::from_cents(1500))
            .await
            .unwrap();

        let fetched = db.customers().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(fetched.full_name, "Rima Haddad");
        assert_eq!(fetched.debt.cents(), 1500);
        assert!(fetched.order_ids.is_empty());

        let entries = db.ledger().for_customer(&c.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, LedgerEntryKind::DebtAdjusted);
        assert_eq!(entries[0].debt_delta.cents(), 1500);
    }

    #[tokio::test]
    async fn test_duplicate_phone_number() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.customers().insert("A", "70123456", Money::zero()).await.unwrap();

        let err = db
            .customers()
            .insert("B", "70123456", Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::DuplicatePhoneNumber(_))));
        assert_eq!(db.customers().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_phone_rejected_before_write() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .customers()
            .insert("A", "70-12-34", Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert!(db.customers().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adjust_debt_and_total() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.customers().insert("A", "70000001", Money::from_cents(500)).await.unwrap();
        db.customers().insert("B", "70000002", Money::from_cents(700)).await.unwrap();

        let a = db.customers().adjust_debt(&a.id, Money::from_cents(200)).await.unwrap();
        assert_eq!(a.debt.cents(), 200);
        assert_eq!(db.customers().total_debt().await.unwrap().cents(), 900);

        let entries = db.ledger().for_customer(&a.id).await.unwrap();
        assert_eq!(entries.last().unwrap().debt_delta.cents(), -300);

        assert!(matches!(
            db.customers().adjust_debt("missing", Money::zero()).await,
            Err(DbError::Core(CoreError::CustomerNotFound(_)))
        ));
        assert!(db.customers().adjust_debt(&a.id, Money::from_cents(-1)).await.is_err());
    }
}
