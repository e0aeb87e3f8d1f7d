//! # Sale Workflow Service
//!
//! The engineering core of the backend: atomic sale creation, payment
//! dispatch, and callback reconciliation.
//!
//! ## Sale Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sale Creation Transaction                            │
//! │                                                                         │
//! │  POST /api/sales                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Resolve customer + products (tenant-scoped)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN ─┬─ reserve stock per item (guarded UPDATE, all-or-nothing)     │
//! │         ├─ insert pending sale + line items                            │
//! │         ├─ cash only: CAS → completed + customer ledger                │
//! │  COMMIT ┘                                                              │
//! │       │                                                                 │
//! │       ├──► best-effort low-stock notifications (after commit)          │
//! │       │                                                                 │
//! │       └──► mobile_money: STK dispatch (after commit, never in-tx)      │
//! │                 │                                                       │
//! │                 ├─ initiated  → store checkout_ref (while pending)     │
//! │                 └─ failed     → sale → failed, stock stays reserved    │
//! │                                                                         │
//! │  Any step failing before COMMIT rolls back every reservation.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Callback Reconciliation
//! The provider may deliver the same callback more than once. Both status
//! transitions are compare-and-set updates guarded on `pending`, and the
//! customer ledger moves only when the CAS reports a row changed. Replays
//! therefore acknowledge without re-applying anything.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use biashara_core::{
    validation, CoreError, Money, PaymentMethod, Sale, SaleItem, SaleStatus,
};
use biashara_db::{generate_id, DbError};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::gateway::{StkCallback, StkPushRequest, StkQueryResponse};
use crate::services::notification::NotificationService;
use crate::state::AppState;
use crate::tenant::TenantScope;

// =============================================================================
// Request Types
// =============================================================================

/// Request body for `POST /api/sales`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSaleRequest {
    /// Customer making the purchase.
    pub customer_id: String,

    /// How the customer pays.
    pub method: PaymentMethod,

    /// Line items. Must be non-empty.
    pub items: Vec<LineItemRequest>,
}

/// One line of a sale request.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// How a provider callback was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This callback completed the sale.
    Completed,

    /// This callback failed the sale.
    Failed,

    /// The sale was already terminal (replay or race), nothing changed.
    AlreadyResolved,

    /// No sale matches the checkout reference, acknowledged and dropped.
    Unknown,
}

// =============================================================================
// Service
// =============================================================================

/// Orchestrates the sale lifecycle.
#[derive(Clone)]
pub struct SaleService {
    state: Arc<AppState>,
}

impl SaleService {
    /// Creates a new SaleService.
    pub fn new(state: Arc<AppState>) -> Self {
        SaleService { state }
    }

    /// Creates a sale in one transaction.
    ///
    /// ## Steps
    /// 1. Validate the request shape
    /// 2. Resolve customer and products within the tenant
    /// 3. Reserve stock per item with guarded decrements, all-or-nothing
    /// 4. Insert the pending sale and its line items
    /// 5. Cash: complete + apply customer ledger inside the same transaction
    /// 6. Commit, then emit low-stock notifications (best-effort)
    ///
    /// Mobile-money sales return still `pending`; the caller dispatches the
    /// STK push via [`dispatch_stk_push`](Self::dispatch_stk_push) after
    /// this function returns.
    pub async fn create_sale(
        &self,
        scope: &TenantScope,
        request: CreateSaleRequest,
    ) -> ApiResult<Sale> {
        validation::validate_line_item_count(request.items.len())?;
        for item in &request.items {
            validation::validate_quantity(item.quantity)?;
        }

        let db = &self.state.db;

        let customer = db
            .customers()
            .get(&request.customer_id, &scope.business_id)
            .await?
            .ok_or_else(|| ApiError::from(CoreError::CustomerNotFound(request.customer_id.clone())))?;

        // Resolve products up front so prices are frozen before any write
        let mut resolved = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = db
                .products()
                .get(&item.product_id, &scope.business_id)
                .await?
                .ok_or_else(|| ApiError::from(CoreError::ProductNotFound(item.product_id.clone())))?;
            resolved.push((product, item.quantity));
        }

        let now = Utc::now();
        let sale_id = generate_id();

        let mut tx = db.begin().await?;

        let mut amount = Money::zero();
        let mut low_stock: Vec<(String, i64)> = Vec::new();
        let mut items = Vec::with_capacity(resolved.len());

        for (product, quantity) in &resolved {
            let reserved = db
                .products()
                .reserve_stock(&mut tx, &product.id, &scope.business_id, *quantity)
                .await?;

            if !reserved {
                // Zero rows can mean shortfall or a concurrently deleted row
                let available = db
                    .products()
                    .stock_level(&mut tx, &product.id, &scope.business_id)
                    .await;
                tx.rollback().await.map_err(DbError::from)?;
                return match available {
                    Ok(available) => Err(CoreError::InsufficientStock {
                        name: product.name.clone(),
                        available,
                        requested: *quantity,
                    }
                    .into()),
                    Err(_) => Err(CoreError::ProductNotFound(product.id.clone()).into()),
                };
            }

            let level = db
                .products()
                .stock_level(&mut tx, &product.id, &scope.business_id)
                .await?;
            if level <= product.low_stock_threshold {
                low_stock.push((product.name.clone(), level));
            }

            let line_total = product.price().multiply_quantity(*quantity);
            amount += line_total;

            items.push(SaleItem {
                id: generate_id(),
                sale_id: sale_id.clone(),
                product_id: product.id.clone(),
                quantity: *quantity,
                unit_price_cents: product.price_cents,
                line_total_cents: line_total.cents(),
                created_at: now,
            });
        }

        let mut sale = Sale {
            id: sale_id,
            business_id: scope.business_id.clone(),
            customer_id: customer.id.clone(),
            amount_cents: amount.cents(),
            method: request.method,
            status: SaleStatus::Pending,
            transaction_ref: generate_id(),
            checkout_ref: None,
            receipt_ref: None,
            created_at: now,
            updated_at: now,
        };

        db.sales().insert_sale(&mut tx, &sale).await?;
        for item in &items {
            db.sales().insert_item(&mut tx, item).await?;
        }

        if request.method == PaymentMethod::Cash {
            // Cash settles at the counter: complete and apply the ledger
            // inside the same transaction as the reservation
            db.sales().complete_sale(&mut tx, &sale.id, None, now).await?;
            db.customers()
                .apply_purchase(&mut tx, &customer.id, &scope.business_id, sale.amount_cents, now)
                .await?;
            sale.status = SaleStatus::Completed;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %sale.id,
            method = ?sale.method,
            amount_cents = sale.amount_cents,
            "Sale created"
        );

        let recipient = scope
            .user_id
            .clone()
            .unwrap_or_else(|| scope.business_id.clone());
        let notifications = NotificationService::new(self.state.clone());
        for (name, level) in &low_stock {
            notifications.notify_low_stock(&recipient, name, *level).await;
        }

        Ok(sale)
    }

    /// Dispatches the STK push for a committed pending sale.
    ///
    /// Runs strictly after the creation transaction committed. On
    /// initiation failure the sale transitions to `failed`; the reserved
    /// stock stays decremented and restocking is a manual follow-up.
    pub async fn dispatch_stk_push(&self, sale: &Sale) -> ApiResult<()> {
        let db = &self.state.db;

        let customer = db
            .customers()
            .get(&sale.customer_id, &sale.business_id)
            .await?
            .ok_or_else(|| ApiError::from(CoreError::CustomerNotFound(sale.customer_id.clone())))?;

        let request = StkPushRequest {
            phone: customer.phone.clone(),
            amount: sale.amount(),
            account_reference: format!("PAY-{}", sale.id),
            description: format!("Payment for order #{}", sale.id),
        };

        match self.state.gateway.initiate_push(&request).await {
            Ok(response) => {
                let attached = db
                    .sales()
                    .attach_checkout_ref(&sale.id, &response.checkout_ref)
                    .await?;
                if attached {
                    info!(
                        sale_id = %sale.id,
                        checkout_ref = %response.checkout_ref,
                        "STK push initiated"
                    );
                } else {
                    warn!(
                        sale_id = %sale.id,
                        "Sale resolved before checkout reference arrived"
                    );
                }
                Ok(())
            }
            Err(e) => {
                warn!(sale_id = %sale.id, error = %e, "STK push failed");
                db.sales().fail_sale(&sale.id, Utc::now()).await?;
                Ok(())
            }
        }
    }

    /// Reconciles a provider callback against its sale.
    ///
    /// Unknown references and replays are acknowledged no-ops. On success
    /// the completion CAS and the customer ledger commit together, and the
    /// ledger moves only when the CAS won.
    pub async fn reconcile_callback(&self, callback: &StkCallback) -> ApiResult<ReconcileOutcome> {
        let db = &self.state.db;

        let Some(sale) = db
            .sales()
            .find_by_checkout_ref(&callback.checkout_request_id)
            .await?
        else {
            warn!(
                checkout_ref = %callback.checkout_request_id,
                "Callback for unknown checkout reference"
            );
            return Ok(ReconcileOutcome::Unknown);
        };

        if sale.status.is_terminal() {
            debug!(sale_id = %sale.id, status = ?sale.status, "Callback replay for resolved sale");
            return Ok(ReconcileOutcome::AlreadyResolved);
        }

        let now = Utc::now();

        if callback.is_success() {
            let receipt = callback.receipt_number();

            let mut tx = db.begin().await?;
            let won = db
                .sales()
                .complete_sale(&mut tx, &sale.id, receipt.as_deref(), now)
                .await?;
            if won {
                db.customers()
                    .apply_purchase(&mut tx, &sale.customer_id, &sale.business_id, sale.amount_cents, now)
                    .await?;
            }
            tx.commit().await.map_err(DbError::from)?;

            if won {
                info!(sale_id = %sale.id, receipt = ?receipt, "Sale completed by callback");
                NotificationService::new(self.state.clone())
                    .notify_payment_received(&sale.business_id, &sale)
                    .await;
                Ok(ReconcileOutcome::Completed)
            } else {
                Ok(ReconcileOutcome::AlreadyResolved)
            }
        } else {
            let won = db.sales().fail_sale(&sale.id, now).await?;
            if won {
                info!(
                    sale_id = %sale.id,
                    result_code = callback.result_code,
                    "Sale failed by callback"
                );
                Ok(ReconcileOutcome::Failed)
            } else {
                Ok(ReconcileOutcome::AlreadyResolved)
            }
        }
    }

    /// Opportunistically polls the provider for a push's status.
    ///
    /// Read-only with respect to the database: authoritative state changes
    /// arrive via the callback, never via this poll.
    pub async fn query_push_status(
        &self,
        scope: &TenantScope,
        sale_id: &str,
    ) -> ApiResult<StkQueryResponse> {
        let sale = self
            .state
            .db
            .sales()
            .get(sale_id, &scope.business_id)
            .await?
            .ok_or_else(|| ApiError::from(CoreError::SaleNotFound(sale_id.to_string())))?;

        let checkout_ref = sale.checkout_ref.as_deref().ok_or_else(|| {
            ApiError::new(
                ErrorCode::InvalidState,
                format!("Sale {sale_id} has no checkout reference"),
            )
        })?;

        let response = self.state.gateway.query_status(checkout_ref).await?;
        Ok(response)
    }
}
