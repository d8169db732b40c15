//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - CRUD operations with pricing validation
//! - Conditional stock updates (never below zero)
//! - Best sellers by `nb_of_orders`
//!
//! ## Stock Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                        │
//! │     SET quantity = quantity - :n, nb_of_orders = nb_of_orders + :n      │
//! │   WHERE id = :id AND quantity >= :n                                     │
//! │                                                                         │
//! │  rows_affected = 1  → stock taken                                       │
//! │  rows_affected = 0  → InsufficientStock, caller rolls back              │
//! │                                                                         │
//! │  Two concurrent orders for the last unit: only one UPDATE matches.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use bazaar_core::validation::{validate_pricing, validate_product_name, validate_stock_level};
use bazaar_core::{CoreError, Gender, Money, NewProduct, Product, TopProduct};

const PRODUCT_COLUMNS: &str = r#"
    id, name, quantity, price_cents, initial_price_cents, nb_of_orders,
    category_id, gender, images, is_active, created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    quantity: i64,
    price_cents: Money,
    initial_price_cents: Money,
    nb_of_orders: i64,
    category_id: Option<String>,
    gender: Option<Gender>,
    images: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        let images: Vec<String> = serde_json::from_str(&row.images)
            .map_err(|e| DbError::Internal(format!("product {} images: {}", row.id, e)))?;

        Ok(Product {
            id: row.id,
            name: row.name,
            quantity: row.quantity,
            price: row.price_cents,
            initial_price: row.initial_price_cents,
            nb_of_orders: row.nb_of_orders,
            category_id: row.category_id,
            gender: row.gender,
            images,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.insert(&new_product).await?;
/// let best = repo.top_products(5).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID, including soft-deleted ones.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Lists active products, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY created_at, rowid"
        );

        let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    /// Inserts a new product.
    ///
    /// ## Validation
    /// - Name required, at most 200 characters
    /// - Stock ≥ 0, prices ≥ 0, cost price ≤ sale price
    /// - Category, when given, must exist
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_product_name(&new.name).map_err(CoreError::from)?;
        validate_stock_level(new.quantity).map_err(CoreError::from)?;
        validate_pricing(new.price, new.initial_price).map_err(CoreError::from)?;

        let mut conn = self.pool.acquire().await?;

        if let Some(category_id) = &new.category_id {
            let exists: Option<String> =
                sqlx::query_scalar("SELECT id FROM categories WHERE id = ?1")
                    .bind(category_id)
                    .fetch_optional(&mut *conn)
                    .await?;
            if exists.is_none() {
                return Err(CoreError::CategoryNotFound(category_id.clone()).into());
            }
        }

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: new.name.trim().to_string(),
            quantity: new.quantity,
            price: new.price,
            initial_price: new.initial_price,
            nb_of_orders: 0,
            category_id: new.category_id.clone(),
            gender: new.gender,
            images: new.images.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        let images = serde_json::to_string(&product.images)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, quantity, price_cents, initial_price_cents, nb_of_orders,
                category_id, gender, images, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, 1, ?9, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.quantity)
        .bind(product.price)
        .bind(product.initial_price)
        .bind(&product.category_id)
        .bind(product.gender)
        .bind(images)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(product)
    }

    /// Changes the sale and cost price.
    ///
    /// Existing orders keep the prices they were snapshotted with.
    pub async fn update_pricing(
        &self,
        id: &str,
        price: Money,
        initial_price: Money,
    ) -> DbResult<Product> {
        validate_pricing(price, initial_price).map_err(CoreError::from)?;

        debug!(id = %id, price = %price, initial_price = %initial_price, "Updating pricing");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET price_cents = ?2, initial_price_cents = ?3, updated_at = ?4
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(price)
        .bind(initial_price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        self.require(id).await
    }

    /// Adjusts stock by `delta` (negative to write off).
    ///
    /// ## Arguments
    /// * `id` - Product ID
    /// * `delta` - Change in stock; the result may not go below zero
    pub async fn restock(&self, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE id = ?1 AND is_active = 1 AND quantity + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                Some(product) if product.is_active => Err(CoreError::InsufficientStock {
                    product: product.name,
                    available: product.quantity,
                    requested: -delta,
                }
                .into()),
                _ => Err(CoreError::ProductNotFound(id.to_string()).into()),
            };
        }

        self.require(id).await
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical orders still reference the row and can roll back
    /// against it; new orders treat it as missing.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?2
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Best sellers, by units sold.
    pub async fn top_products(&self, limit: u32) -> DbResult<Vec<TopProduct>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 \
             ORDER BY nb_of_orders DESC, name LIMIT ?1"
        );

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Product::try_from(row).map(|p| TopProduct {
                    image: p.images.first().cloned(),
                    id: p.id,
                    name: p.name,
                    nb_of_orders: p.nb_of_orders,
                    price: p.price,
                    quantity: p.quantity,
                })
            })
            .collect()
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads a product on an open connection or transaction.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

    let row: Option<ProductRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(Product::try_from).transpose()
}

/// Takes `quantity` units out of stock and counts them as sold.
///
/// Returns `false` when stock is insufficient or the product is inactive;
/// nothing is written in that case.
pub(crate) async fn take_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity - ?2,
            nb_of_orders = nb_of_orders + ?2,
            updated_at = ?3
        WHERE id = ?1 AND is_active = 1 AND quantity >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Puts `quantity` units back and removes them from the sold counter.
///
/// Applies to inactive products too.
pub(crate) async fn return_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity + ?2,
            nb_of_orders = nb_of_orders - ?2,
            updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(product_id = %product_id, quantity, "Rollback target product is gone");
    }

    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use bazaar_core::{CoreError, Money, NewProduct};

    use crate::error::DbError;

    fn shirt(quantity: i64) -> NewProduct {
        NewProduct {
            name: "Linen Shirt".to_string(),
            quantity,
            price: Money::from_cents(5000),
            initial_price: Money::from_cents(3000),
            gender: None,
            category_id: None,
            images: vec!["https://cdn.example/shirt.jpg".to_string()],
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.products().insert(&shirt(10)).await.unwrap();

        let fetched = db.products().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Linen Shirt");
        assert_eq!(fetched.quantity, 10);
        assert_eq!(fetched.images, created.images);
        assert_eq!(fetched.profit_per_unit().cents(), 2000);
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_cost_above_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut bad = shirt(1);
        bad.initial_price = Money::from_cents(6000);

        let err = db.products().insert(&bad).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_with_unknown_category() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut p = shirt(1);
        p.category_id = Some("missing".to_string());

        let err = db.products().insert(&p).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::CategoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_restock_never_goes_negative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = db.products().insert(&shirt(3)).await.unwrap();

        let p = db.products().restock(&p.id, 4).await.unwrap();
        assert_eq!(p.quantity, 7);

        let err = db.products().restock(&p.id, -8).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 7, requested: 8, .. })
        ));
        assert_eq!(db.products().get_by_id(&p.id).await.unwrap().unwrap().quantity, 7);
    }

    #[tokio::test]
    async fn test_update_pricing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = db.products().insert(&shirt(3)).await.unwrap();

        let p = db
            .products()
            .update_pricing(&p.id, Money::from_cents(4500), Money::from_cents(2500))
            .await
            .unwrap();
        assert_eq!(p.price.cents(), 4500);

        assert!(db
            .products()
            .update_pricing(&p.id, Money::from_cents(100), Money::from_cents(200))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_listing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = db.products().insert(&shirt(3)).await.unwrap();

        db.products().soft_delete(&p.id).await.unwrap();

        assert!(db.products().list().await.unwrap().is_empty());
        let row = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert!(!row.is_active);
        assert!(matches!(
            db.products().soft_delete(&p.id).await,
            Err(DbError::Core(CoreError::ProductNotFound(_)))
        ));
    }
}
