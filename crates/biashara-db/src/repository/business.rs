//! # Business Repository
//!
//! Database operations for business accounts.
//!
//! Businesses are the tenant root: every product, customer, and sale hangs
//! off a business row via foreign key. This repository is small on purpose,
//! account management happens out of band.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use biashara_core::Business;

/// Repository for business database operations.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: SqlitePool,
}

impl BusinessRepository {
    /// Creates a new BusinessRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BusinessRepository { pool }
    }

    /// Inserts a new business.
    ///
    /// ## Returns
    /// * `Ok(Business)` - Inserted business
    /// * `Err(DbError::UniqueViolation)` - ID already exists
    pub async fn insert(&self, business: &Business) -> DbResult<Business> {
        debug!(id = %business.id, name = %business.name, "Inserting business");

        sqlx::query(
            r#"
            INSERT INTO businesses (id, name, owner_email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.owner_email)
        .bind(business.created_at)
        .execute(&self.pool)
        .await?;

        Ok(business.clone())
    }

    /// Gets a business by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Business))` - Business found
    /// * `Ok(None)` - Business not found
    pub async fn get(&self, id: &str) -> DbResult<Option<Business>> {
        let business = sqlx::query_as::<_, Business>(
            r#"
            SELECT id, name, owner_email, created_at
            FROM businesses
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(business)
    }

    /// Checks that a business exists, returning NotFound otherwise.
    ///
    /// ## Usage
    /// Called at the top of request handlers to reject requests for
    /// unknown tenants before doing any real work.
    pub async fn require(&self, id: &str) -> DbResult<Business> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Business", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    #[tokio::test]
    async fn test_insert_and_get_business() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let business = Business {
            id: "biz-1".to_string(),
            name: "Mama Njeri Shop".to_string(),
            owner_email: "njeri@example.com".to_string(),
            created_at: Utc::now(),
        };

        db.businesses().insert(&business).await.unwrap();

        let found = db.businesses().get("biz-1").await.unwrap().unwrap();
        assert_eq!(found.name, "Mama Njeri Shop");
        assert_eq!(found.owner_email, "njeri@example.com");
    }

    #[tokio::test]
    async fn test_require_unknown_business() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db.businesses().require("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
