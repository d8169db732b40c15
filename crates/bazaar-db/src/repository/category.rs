//! # Category Repository
//!
//! Categories group products. Membership lives on `products.category_id`;
//! a category's product list is read back from there.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use bazaar_core::validation::validate_category_name;
use bazaar_core::{Category, CoreError};

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: String,
    name: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryRow {
    fn into_category(self, product_ids: Vec<String>) -> Category {
        Category {
            id: self.id,
            name: self.name,
            image: self.image,
            product_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category. Names are unique.
    pub async fn insert(&self, name: &str, image: Option<&str>) -> DbResult<Category> {
        validate_category_name(name).map_err(CoreError::from)?;

        let name = name.trim();
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        debug!(id = %id, name = %name, "Inserting category");

        let result = sqlx::query(
            r#"
            INSERT INTO categories (id, name, image, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(image)
        .bind(now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            return Err(match DbError::from(e) {
                DbError::UniqueViolation { .. } => CoreError::DuplicateCategory(name.to_string()).into(),
                other => other,
            });
        }

        Ok(Category {
            id,
            name: name.to_string(),
            image: image.map(str::to_string),
            product_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a category with its product ids.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let mut conn = self.pool.acquire().await?;

        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, image, created_at, updated_at FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let product_ids = product_ids_for(&mut conn, id).await?;
        Ok(Some(row.into_category(product_ids)))
    }

    /// Lists categories by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, image, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(&mut *conn)
        .await?;

        let members: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT category_id, id FROM products
            WHERE category_id IS NOT NULL AND is_active = 1
            ORDER BY created_at, rowid
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut by_category: HashMap<String, Vec<String>> = HashMap::new();
        for (category_id, product_id) in members {
            by_category.entry(category_id).or_default().push(product_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let ids = by_category.remove(&row.id).unwrap_or_default();
                row.into_category(ids)
            })
            .collect())
    }

    /// Moves a product into a category.
    pub async fn assign_product(&self, category_id: &str, product_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?1")
            .bind(category_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(CoreError::CategoryNotFound(category_id.to_string()).into());
        }

        let result = sqlx::query(
            r#"
            UPDATE products SET category_id = ?2, updated_at = ?3
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(product_id)
        .bind(category_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        tx.commit().await?;

        debug!(category_id = %category_id, product_id = %product_id, "Product assigned");
        Ok(())
    }
}

async fn product_ids_for(conn: &mut SqliteConnection, category_id: &str) -> DbResult<Vec<String>> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM products
        WHERE category_id = ?1 AND is_active = 1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(category_id)
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
    use bazaar_core::{CoreError, Money, NewProduct};

    fn product(name: &str, category_id: Option<String>) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            quantity: 5,
            price: Money::from_cents(2000),
            initial_price: Money::from_cents(1000),
            gender: None,
            category_id,
            images: vec![],
        }
    }

    #[tokio::test]
    async fn test_category_lists_its_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shirts = db.categories().insert("Shirts", None).await.unwrap();

        let a = db.products().insert(&product("Oxford", Some(shirts.id.clone()))).await.unwrap();
        let b = db.products().insert(&product("Polo", None)).await.unwrap();
        db.categories().assign_product(&shirts.id, &b.id).await.unwrap();

        let fetched = db.categories().get_by_id(&shirts.id).await.unwrap().unwrap();
        assert_eq!(fetched.product_ids, vec![a.id.clone(), b.id.clone()]);

        let all = db.categories().list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].product_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_category_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.categories().insert("Shoes", None).await.unwrap();

        let err = db.categories().insert("Shoes", None).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::DuplicateCategory(_))));
    }

    #[tokio::test]
    async fn test_assign_to_missing_category() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = db.products().insert(&product("Belt", None)).await.unwrap();

        let err = db.categories().assign_product("nope", &p.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::CategoryNotFound(_))));
    }
}
