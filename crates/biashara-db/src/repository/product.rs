//! # Product Repository
//!
//! Database operations for products, including the guarded stock decrement
//! that backs atomic sale creation.
//!
//! ## Stock Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Guarded Stock Decrement                              │
//! │                                                                         │
//! │  ❌ WRONG: Read-then-write (race window between read and write)        │
//! │     SELECT stock FROM products WHERE id = ?                             │
//! │     -- another request decrements here --                               │
//! │     UPDATE products SET stock = 3 WHERE id = ?                          │
//! │                                                                         │
//! │  ✅ CORRECT: Single conditional statement                               │
//! │     UPDATE products SET stock = stock - ?qty                            │
//! │     WHERE id = ? AND business_id = ? AND stock >= ?qty                  │
//! │                                                                         │
//! │  rows_affected == 1  →  reservation succeeded                           │
//! │  rows_affected == 0  →  not enough stock (or wrong tenant)              │
//! │                                                                         │
//! │  Two concurrent sales of the last unit: SQLite serializes the two      │
//! │  UPDATEs, the first wins, the second matches no row.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use biashara_core::Product;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// // Tenant-scoped lookup
/// let product = repo.get("uuid-here", "business-uuid").await?;
///
/// // Inside a sale transaction
/// let reserved = repo.reserve_stock(&mut tx, &id, &business_id, 2).await?;
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

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::ForeignKeyViolation)` - Business does not exist
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, business_id, name, category,
                price_cents, stock, low_stock_threshold,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.business_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.low_stock_threshold)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Gets a product by ID, scoped to a business.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found in this business
    /// * `Ok(None)` - Product not found, or owned by another business
    pub async fn get(&self, id: &str, business_id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, business_id, name, category,
                   price_cents, stock, low_stock_threshold,
                   created_at, updated_at
            FROM products
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists all products for a business, sorted by name.
    pub async fn list(&self, business_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, business_id, name, category,
                   price_cents, stock, low_stock_threshold,
                   created_at, updated_at
            FROM products
            WHERE business_id = ?1
            ORDER BY name
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates an existing product's editable fields.
    ///
    /// Stock is NOT updated here. Stock only changes through
    /// [`reserve_stock`](Self::reserve_stock) and [`restock`](Self::restock)
    /// so every movement is accounted for.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist in this business
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                category = ?4,
                price_cents = ?5,
                low_stock_threshold = ?6,
                updated_at = ?7
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(&product.id)
        .bind(&product.business_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.low_stock_threshold)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Deletes a product.
    ///
    /// ## Returns
    /// * `Ok(())` - Delete successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist in this business
    /// * `Err(DbError::ForeignKeyViolation)` - Product is referenced by sales
    pub async fn delete(&self, id: &str, business_id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query(
            r#"
            DELETE FROM products
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Atomically reserves stock for a sale line item.
    ///
    /// Runs inside the caller's transaction so a failed reservation later
    /// in the same sale rolls back every earlier decrement.
    ///
    /// ## Arguments
    /// * `tx` - Open sale transaction
    /// * `id` - Product ID
    /// * `business_id` - Tenant scope
    /// * `quantity` - Units to reserve (must be positive)
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock decremented by `quantity`
    /// * `Ok(false)` - Insufficient stock, or product not in this business
    pub async fn reserve_stock(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        business_id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        debug!(id = %id, quantity = %quantity, "Reserving stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?3,
                updated_at = ?4
            WHERE id = ?1 AND business_id = ?2 AND stock >= ?3
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reads the current stock level inside an open transaction.
    ///
    /// ## Usage
    /// Called right after [`reserve_stock`](Self::reserve_stock) to decide
    /// whether a low-stock notification is due once the sale commits.
    pub async fn stock_level(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        business_id: &str,
    ) -> DbResult<i64> {
        let stock: i64 = sqlx::query_scalar(
            r#"
            SELECT stock FROM products
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))?;

        Ok(stock)
    }

    /// Adds stock back (restocking, not sale reversal).
    ///
    /// ## Arguments
    /// * `quantity` - Units to add (must be positive)
    pub async fn restock(&self, id: &str, business_id: &str, quantity: i64) -> DbResult<()> {
        debug!(id = %id, quantity = %quantity, "Restocking product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?3,
                updated_at = ?4
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products for a business (for diagnostics).
    pub async fn count(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE business_id = ?1")
                .bind(business_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use biashara_core::Business;

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let business = Business {
            id: "biz-1".to_string(),
            name: "Test Shop".to_string(),
            owner_email: "owner@example.com".to_string(),
            created_at: Utc::now(),
        };
        db.businesses().insert(&business).await.unwrap();
        db
    }

    fn sample_product(id: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            business_id: "biz-1".to_string(),
            name: format!("Product {id}"),
            category: "general".to_string(),
            price_cents: 10_000,
            stock,
            low_stock_threshold: 10,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_get_scoped_by_business() {
        let db = seeded_db().await;
        db.products().insert(&sample_product("p-1", 5)).await.unwrap();

        assert!(db.products().get("p-1", "biz-1").await.unwrap().is_some());
        // Same ID under another business resolves to nothing
        assert!(db.products().get("p-1", "biz-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reserve_stock_succeeds_and_decrements() {
        let db = seeded_db().await;
        db.products().insert(&sample_product("p-1", 5)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let reserved = db
            .products()
            .reserve_stock(&mut tx, "p-1", "biz-1", 2)
            .await
            .unwrap();
        assert!(reserved);

        let level = db
            .products()
            .stock_level(&mut tx, "p-1", "biz-1")
            .await
            .unwrap();
        assert_eq!(level, 3);

        tx.commit().await.unwrap();

        let product = db.products().get("p-1", "biz-1").await.unwrap().unwrap();
        assert_eq!(product.stock, 3);
    }

    #[tokio::test]
    async fn test_reserve_stock_fails_when_insufficient() {
        let db = seeded_db().await;
        db.products().insert(&sample_product("p-1", 1)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let reserved = db
            .products()
            .reserve_stock(&mut tx, "p-1", "biz-1", 2)
            .await
            .unwrap();
        assert!(!reserved);
        tx.rollback().await.unwrap();

        // Stock untouched
        let product = db.products().get("p-1", "biz-1").await.unwrap().unwrap();
        assert_eq!(product.stock, 1);
    }

    #[tokio::test]
    async fn test_rollback_restores_earlier_reservations() {
        let db = seeded_db().await;
        db.products().insert(&sample_product("p-1", 5)).await.unwrap();
        db.products().insert(&sample_product("p-2", 0)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert!(db
            .products()
            .reserve_stock(&mut tx, "p-1", "biz-1", 3)
            .await
            .unwrap());
        assert!(!db
            .products()
            .reserve_stock(&mut tx, "p-2", "biz-1", 1)
            .await
            .unwrap());
        tx.rollback().await.unwrap();

        let p1 = db.products().get("p-1", "biz-1").await.unwrap().unwrap();
        assert_eq!(p1.stock, 5);
    }

    #[tokio::test]
    async fn test_reserve_stock_wrong_tenant() {
        let db = seeded_db().await;
        db.products().insert(&sample_product("p-1", 5)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let reserved = db
            .products()
            .reserve_stock(&mut tx, "p-1", "biz-other", 1)
            .await
            .unwrap();
        assert!(!reserved);
        tx.rollback().await.unwrap();
    }
}
