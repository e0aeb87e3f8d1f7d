//! # Customer Repository
//!
//! Database operations for customers, including the purchase ledger that
//! tracks lifetime spend per customer.
//!
//! ## Purchase Ledger
//! The `total_purchases_cents` and `last_purchase` columns only move when a
//! sale reaches `completed`. Pending mobile-money sales never touch the
//! ledger, and a sale that fails leaves it unchanged.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use biashara_core::Customer;

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

    /// Inserts a new customer.
    ///
    /// ## Returns
    /// * `Ok(Customer)` - Inserted customer
    /// * `Err(DbError::ForeignKeyViolation)` - Business does not exist
    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        debug!(id = %customer.id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, business_id, name, phone, email,
                total_purchases_cents, last_purchase, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.business_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.total_purchases_cents)
        .bind(customer.last_purchase)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer.clone())
    }

    /// Gets a customer by ID, scoped to a business.
    ///
    /// ## Returns
    /// * `Ok(Some(Customer))` - Customer found in this business
    /// * `Ok(None)` - Customer not found, or owned by another business
    pub async fn get(&self, id: &str, business_id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, business_id, name, phone, email,
                   total_purchases_cents, last_purchase, created_at
            FROM customers
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists all customers for a business, sorted by name.
    pub async fn list(&self, business_id: &str) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, business_id, name, phone, email,
                   total_purchases_cents, last_purchase, created_at
            FROM customers
            WHERE business_id = ?1
            ORDER BY name
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Updates a customer's contact fields.
    ///
    /// The ledger columns are excluded. They only change through
    /// [`apply_purchase`](Self::apply_purchase).
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Customer doesn't exist in this business
    pub async fn update(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Updating customer");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?3,
                phone = ?4,
                email = ?5
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.business_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
        }

        Ok(())
    }

    /// Deletes a customer.
    ///
    /// ## Returns
    /// * `Ok(())` - Delete successful
    /// * `Err(DbError::NotFound)` - Customer doesn't exist in this business
    /// * `Err(DbError::ForeignKeyViolation)` - Customer is referenced by sales
    pub async fn delete(&self, id: &str, business_id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query(
            r#"
            DELETE FROM customers
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Applies a completed purchase to the customer ledger.
    ///
    /// Runs inside the completing transaction so the ledger moves exactly
    /// when the sale's status does.
    ///
    /// ## Arguments
    /// * `tx` - Open completion transaction
    /// * `id` - Customer ID
    /// * `business_id` - Tenant scope
    /// * `amount_cents` - Completed sale total
    /// * `at` - Completion timestamp, recorded as `last_purchase`
    pub async fn apply_purchase(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        business_id: &str,
        amount_cents: i64,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, amount_cents = %amount_cents, "Applying purchase to ledger");

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET total_purchases_cents = total_purchases_cents + ?3,
                last_purchase = ?4
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(amount_cents)
        .bind(at)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
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

    fn sample_customer(id: &str) -> Customer {
        Customer {
            id: id.to_string(),
            business_id: "biz-1".to_string(),
            name: "Wanjiku".to_string(),
            phone: "254712345678".to_string(),
            email: None,
            total_purchases_cents: 0,
            last_purchase: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = seeded_db().await;
        db.customers().insert(&sample_customer("c-1")).await.unwrap();

        let all = db.customers().list("biz-1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].phone, "254712345678");
    }

    #[tokio::test]
    async fn test_apply_purchase_accumulates() {
        let db = seeded_db().await;
        db.customers().insert(&sample_customer("c-1")).await.unwrap();

        let now = Utc::now();

        let mut tx = db.begin().await.unwrap();
        db.customers()
            .apply_purchase(&mut tx, "c-1", "biz-1", 25_000, now)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        db.customers()
            .apply_purchase(&mut tx, "c-1", "biz-1", 5_000, now)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let customer = db.customers().get("c-1", "biz-1").await.unwrap().unwrap();
        assert_eq!(customer.total_purchases_cents, 30_000);
        assert!(customer.last_purchase.is_some());
    }

    #[tokio::test]
    async fn test_apply_purchase_wrong_tenant() {
        let db = seeded_db().await;
        db.customers().insert(&sample_customer("c-1")).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let err = db
            .customers()
            .apply_purchase(&mut tx, "c-1", "biz-other", 1_000, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        tx.rollback().await.unwrap();
    }
}
