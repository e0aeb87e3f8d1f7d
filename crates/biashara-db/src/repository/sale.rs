//! # Sale Repository
//!
//! Database operations for sales and sale line items, including the
//! compare-and-set status transitions that make callback reconciliation
//! idempotent.
//!
//! ## Status Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sale Status State Machine                            │
//! │                                                                         │
//! │                  complete_sale (CAS on 'pending')                       │
//! │        ┌───────────────────────────────────────────► completed          │
//! │        │                                                                │
//! │    pending                                                              │
//! │        │                                                                │
//! │        └───────────────────────────────────────────► failed             │
//! │                  fail_sale (CAS on 'pending')                           │
//! │                                                                         │
//! │  Both transitions are a single conditional UPDATE:                      │
//! │     UPDATE sales SET status = ... WHERE id = ? AND status = 'pending'   │
//! │                                                                         │
//! │  rows_affected == 1  →  this caller performed the transition            │
//! │  rows_affected == 0  →  someone else got there first (replay, race)     │
//! │                                                                         │
//! │  Completed and failed are terminal. A replayed provider callback        │
//! │  matches no row and becomes a no-op.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::DbResult;
use biashara_core::{PaymentMethod, Sale, SaleItem, SaleStatus};

/// Repository for sale database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = SaleRepository::new(pool);
///
/// // Inside the sale creation transaction
/// repo.insert_sale(&mut tx, &sale).await?;
/// repo.insert_item(&mut tx, &item).await?;
///
/// // Callback reconciliation
/// if let Some(sale) = repo.find_by_checkout_ref(&checkout_ref).await? {
///     let won = repo.complete_sale(&mut tx, &sale.id, Some(&receipt), now).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale header inside an open transaction.
    ///
    /// ## Returns
    /// * `Ok(())` - Inserted
    /// * `Err(DbError::UniqueViolation)` - transaction_ref already exists
    pub async fn insert_sale(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        sale: &Sale,
    ) -> DbResult<()> {
        debug!(id = %sale.id, transaction_ref = %sale.transaction_ref, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, business_id, customer_id, amount_cents,
                method, status, transaction_ref, checkout_ref, receipt_ref,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.business_id)
        .bind(&sale.customer_id)
        .bind(sale.amount_cents)
        .bind(sale.method)
        .bind(sale.status)
        .bind(&sale.transaction_ref)
        .bind(&sale.checkout_ref)
        .bind(&sale.receipt_ref)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Inserts a sale line item inside an open transaction.
    pub async fn insert_item(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        item: &SaleItem,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, quantity,
                unit_price_cents, line_total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .bind(item.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Gets a sale by ID, scoped to a business.
    ///
    /// ## Returns
    /// * `Ok(Some(Sale))` - Sale found in this business
    /// * `Ok(None)` - Sale not found, or owned by another business
    pub async fn get(&self, id: &str, business_id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, business_id, customer_id, amount_cents,
                   method, status, transaction_ref, checkout_ref, receipt_ref,
                   created_at, updated_at
            FROM sales
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets the line items for a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, quantity,
                   unit_price_cents, line_total_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists sales for a business, newest first, with optional filters.
    ///
    /// ## Arguments
    /// * `status` - Only sales with this status, if given
    /// * `method` - Only sales paid with this method, if given
    pub async fn list(
        &self,
        business_id: &str,
        status: Option<SaleStatus>,
        method: Option<PaymentMethod>,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, business_id, customer_id, amount_cents,
                   method, status, transaction_ref, checkout_ref, receipt_ref,
                   created_at, updated_at
            FROM sales
            WHERE business_id = ?1
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR method = ?3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(business_id)
        .bind(status)
        .bind(method)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Transitions a pending sale to completed.
    ///
    /// Single compare-and-set statement: only one caller can ever win the
    /// transition. Runs inside the caller's transaction so the customer
    /// ledger update commits together with the status change.
    ///
    /// ## Arguments
    /// * `receipt_ref` - Provider receipt, if the payment produced one
    ///
    /// ## Returns
    /// * `Ok(true)` - This caller completed the sale
    /// * `Ok(false)` - Sale was not pending (already completed or failed)
    pub async fn complete_sale(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        receipt_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, "Completing sale");

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = ?2,
                receipt_ref = ?3,
                updated_at = ?4
            WHERE id = ?1 AND status = ?5
            "#,
        )
        .bind(id)
        .bind(SaleStatus::Completed)
        .bind(receipt_ref)
        .bind(now)
        .bind(SaleStatus::Pending)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Transitions a pending sale to failed.
    ///
    /// Reserved stock is NOT restored. The merchant resolves the
    /// discrepancy manually, typically by restocking.
    ///
    /// ## Returns
    /// * `Ok(true)` - This caller failed the sale
    /// * `Ok(false)` - Sale was not pending
    pub async fn fail_sale(&self, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        debug!(id = %id, "Failing sale");

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(id)
        .bind(SaleStatus::Failed)
        .bind(now)
        .bind(SaleStatus::Pending)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Attaches the provider checkout reference to a pending sale.
    ///
    /// Called after push initiation succeeds. Guarded on `pending` so a
    /// sale that already resolved cannot pick up a stale reference.
    ///
    /// ## Returns
    /// * `Ok(true)` - Reference stored
    /// * `Ok(false)` - Sale was not pending
    pub async fn attach_checkout_ref(&self, id: &str, checkout_ref: &str) -> DbResult<bool> {
        debug!(id = %id, checkout_ref = %checkout_ref, "Attaching checkout reference");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET checkout_ref = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(id)
        .bind(checkout_ref)
        .bind(now)
        .bind(SaleStatus::Pending)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Finds a sale by its provider checkout reference.
    ///
    /// Deliberately NOT tenant-scoped: provider callbacks carry no tenant
    /// header, the checkout reference is globally unique and is the only
    /// key the provider echoes back.
    pub async fn find_by_checkout_ref(&self, checkout_ref: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, business_id, customer_id, amount_cents,
                   method, status, transaction_ref, checkout_ref, receipt_ref,
                   created_at, updated_at
            FROM sales
            WHERE checkout_ref = ?1
            "#,
        )
        .bind(checkout_ref)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Counts sales for a business (for diagnostics).
    pub async fn count(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE business_id = ?1")
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
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use biashara_core::{Business, Customer};

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.businesses()
            .insert(&Business {
                id: "biz-1".to_string(),
                name: "Test Shop".to_string(),
                owner_email: "owner@example.com".to_string(),
                created_at: now,
            })
            .await
            .unwrap();
        db.customers()
            .insert(&Customer {
                id: "c-1".to_string(),
                business_id: "biz-1".to_string(),
                name: "Wanjiku".to_string(),
                phone: "254712345678".to_string(),
                email: None,
                total_purchases_cents: 0,
                last_purchase: None,
                created_at: now,
            })
            .await
            .unwrap();
        db
    }

    fn sample_sale(id: &str, transaction_ref: &str, status: SaleStatus) -> Sale {
        let now = Utc::now();
        Sale {
            id: id.to_string(),
            business_id: "biz-1".to_string(),
            customer_id: "c-1".to_string(),
            amount_cents: 25_000,
            method: PaymentMethod::MobileMoney,
            status,
            transaction_ref: transaction_ref.to_string(),
            checkout_ref: None,
            receipt_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert_sale(db: &Database, sale: &Sale) {
        let mut tx = db.begin().await.unwrap();
        db.sales().insert_sale(&mut tx, sale).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get_sale() {
        let db = seeded_db().await;
        insert_sale(&db, &sample_sale("s-1", "TXN-1", SaleStatus::Pending)).await;

        let sale = db.sales().get("s-1", "biz-1").await.unwrap().unwrap();
        assert_eq!(sale.status, SaleStatus::Pending);
        assert_eq!(sale.amount_cents, 25_000);

        // Other tenant sees nothing
        assert!(db.sales().get("s-1", "biz-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_transaction_ref_rejected() {
        let db = seeded_db().await;
        insert_sale(&db, &sample_sale("s-1", "TXN-1", SaleStatus::Pending)).await;

        let mut tx = db.begin().await.unwrap();
        let err = db
            .sales()
            .insert_sale(&mut tx, &sample_sale("s-2", "TXN-1", SaleStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_sale_wins_once() {
        let db = seeded_db().await;
        insert_sale(&db, &sample_sale("s-1", "TXN-1", SaleStatus::Pending)).await;

        let now = Utc::now();

        let mut tx = db.begin().await.unwrap();
        let won = db
            .sales()
            .complete_sale(&mut tx, "s-1", Some("RCPT123"), now)
            .await
            .unwrap();
        assert!(won);
        tx.commit().await.unwrap();

        // Replay loses the compare-and-set
        let mut tx = db.begin().await.unwrap();
        let won_again = db
            .sales()
            .complete_sale(&mut tx, "s-1", Some("RCPT123"), now)
            .await
            .unwrap();
        assert!(!won_again);
        tx.rollback().await.unwrap();

        let sale = db.sales().get("s-1", "biz-1").await.unwrap().unwrap();
        assert_eq!(sale.status, SaleStatus::Completed);
        assert_eq!(sale.receipt_ref.as_deref(), Some("RCPT123"));
    }

    #[tokio::test]
    async fn test_fail_sale_only_from_pending() {
        let db = seeded_db().await;
        insert_sale(&db, &sample_sale("s-1", "TXN-1", SaleStatus::Pending)).await;

        let now = Utc::now();
        assert!(db.sales().fail_sale("s-1", now).await.unwrap());
        // Terminal state, second attempt is a no-op
        assert!(!db.sales().fail_sale("s-1", now).await.unwrap());

        let sale = db.sales().get("s-1", "biz-1").await.unwrap().unwrap();
        assert_eq!(sale.status, SaleStatus::Failed);
    }

    #[tokio::test]
    async fn test_attach_and_find_by_checkout_ref() {
        let db = seeded_db().await;
        insert_sale(&db, &sample_sale("s-1", "TXN-1", SaleStatus::Pending)).await;

        assert!(db
            .sales()
            .attach_checkout_ref("s-1", "ws_CO_001")
            .await
            .unwrap());

        let sale = db.sales().find_by_checkout_ref("ws_CO_001").await.unwrap();
        assert_eq!(sale.unwrap().id, "s-1");

        assert!(db
            .sales()
            .find_by_checkout_ref("ws_CO_unknown")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_attach_checkout_ref_rejected_after_terminal() {
        let db = seeded_db().await;
        insert_sale(&db, &sample_sale("s-1", "TXN-1", SaleStatus::Pending)).await;

        db.sales().fail_sale("s-1", Utc::now()).await.unwrap();

        assert!(!db
            .sales()
            .attach_checkout_ref("s-1", "ws_CO_001")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let db = seeded_db().await;
        insert_sale(&db, &sample_sale("s-1", "TXN-1", SaleStatus::Pending)).await;
        insert_sale(&db, &sample_sale("s-2", "TXN-2", SaleStatus::Completed)).await;

        let all = db.sales().list("biz-1", None, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let pending = db
            .sales()
            .list("biz-1", Some(SaleStatus::Pending), None)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "s-1");

        let cash = db
            .sales()
            .list("biz-1", None, Some(PaymentMethod::Cash))
            .await
            .unwrap();
        assert!(cash.is_empty());
    }
}
