//! End-to-end sale workflow tests against an in-memory database and a
//! scripted payment gateway.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;

use biashara_core::{Business, Customer, PaymentMethod, Product, SaleStatus};
use biashara_db::{Database, DbConfig};
use biashara_server::error::ErrorCode;
use biashara_server::gateway::{
    CallbackEnvelope, GatewayError, GatewayResult, PaymentGateway, StkCallback, StkPushRequest,
    StkPushResponse, StkQueryResponse,
};
use biashara_server::routes::build_router;
use biashara_server::services::sale::{CreateSaleRequest, LineItemRequest, ReconcileOutcome};
use biashara_server::services::SaleService;
use biashara_server::state::AppState;
use biashara_server::ServerConfig;
use biashara_server::tenant::TenantScope;

// =============================================================================
// Scripted Gateway
// =============================================================================

#[derive(Default)]
struct MockGateway {
    fail_next_push: AtomicBool,
    counter: AtomicU64,
    pushes: Mutex<Vec<StkPushRequest>>,
}

impl MockGateway {
    fn fail_next(&self) {
        self.fail_next_push.store(true, Ordering::SeqCst);
    }

    fn pushes(&self) -> Vec<StkPushRequest> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initiate_push(&self, request: &StkPushRequest) -> GatewayResult<StkPushResponse> {
        self.pushes.lock().unwrap().push(request.clone());

        if self.fail_next_push.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Request("connection refused".to_string()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(StkPushResponse {
            checkout_ref: format!("ws_CO_TEST_{n}"),
            merchant_ref: Some(format!("merchant-{n}")),
        })
    }

    async fn query_status(&self, _checkout_ref: &str) -> GatewayResult<StkQueryResponse> {
        Ok(StkQueryResponse {
            result_code: Some("0".to_string()),
            result_desc: Some("The service request is processed successfully.".to_string()),
        })
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    state: Arc<AppState>,
    gateway: Arc<MockGateway>,
}

impl Harness {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let gateway = Arc::new(MockGateway::default());
        let config = ServerConfig::load().unwrap();
        let state = AppState::new(db, gateway.clone(), config);

        seed(&state.db).await;

        Harness { state, gateway }
    }

    fn service(&self) -> SaleService {
        SaleService::new(self.state.clone())
    }

    fn scope(&self) -> TenantScope {
        TenantScope {
            business_id: "biz-1".to_string(),
            user_id: Some("user-1".to_string()),
        }
    }

    fn db(&self) -> &Database {
        &self.state.db
    }
}

async fn seed(db: &Database) {
    let now = Utc::now();

    db.businesses()
        .insert(&Business {
            id: "biz-1".to_string(),
            name: "Mama Njeri Shop".to_string(),
            owner_email: "njeri@example.com".to_string(),
            created_at: now,
        })
        .await
        .unwrap();

    db.customers()
        .insert(&Customer {
            id: "cust-1".to_string(),
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

    // 100.00 each, 5 in stock
    db.products()
        .insert(&Product {
            id: "prod-1".to_string(),
            business_id: "biz-1".to_string(),
            name: "Maize Flour 2kg".to_string(),
            category: "groceries".to_string(),
            price_cents: 10_000,
            stock: 5,
            low_stock_threshold: 2,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    // 50.00 each, 3 in stock
    db.products()
        .insert(&Product {
            id: "prod-2".to_string(),
            business_id: "biz-1".to_string(),
            name: "Sugar 1kg".to_string(),
            category: "groceries".to_string(),
            price_cents: 5_000,
            stock: 3,
            low_stock_threshold: 2,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

fn two_item_request(method: PaymentMethod) -> CreateSaleRequest {
    CreateSaleRequest {
        customer_id: "cust-1".to_string(),
        method,
        items: vec![
            LineItemRequest {
                product_id: "prod-1".to_string(),
                quantity: 2,
            },
            LineItemRequest {
                product_id: "prod-2".to_string(),
                quantity: 1,
            },
        ],
    }
}

fn success_callback(checkout_ref: &str, receipt: &str) -> StkCallback {
    let envelope: CallbackEnvelope = serde_json::from_value(json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout_ref,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": 250.0 },
                        { "Name": "MpesaReceiptNumber", "Value": receipt },
                        { "Name": "PhoneNumber", "Value": 254712345678i64 }
                    ]
                }
            }
        }
    }))
    .unwrap();
    envelope.body.stk_callback
}

fn failure_callback(checkout_ref: &str) -> StkCallback {
    let envelope: CallbackEnvelope = serde_json::from_value(json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-2",
                "CheckoutRequestID": checkout_ref,
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user"
            }
        }
    }))
    .unwrap();
    envelope.body.stk_callback
}

// =============================================================================
// Cash Sales
// =============================================================================

#[tokio::test]
async fn cash_sale_completes_in_one_transaction() {
    let h = Harness::new().await;

    let sale = h
        .service()
        .create_sale(&h.scope(), two_item_request(PaymentMethod::Cash))
        .await
        .unwrap();

    // 2 x 100.00 + 1 x 50.00 = 250.00
    assert_eq!(sale.amount_cents, 25_000);
    assert_eq!(sale.status, SaleStatus::Completed);

    let p1 = h.db().products().get("prod-1", "biz-1").await.unwrap().unwrap();
    let p2 = h.db().products().get("prod-2", "biz-1").await.unwrap().unwrap();
    assert_eq!(p1.stock, 3);
    assert_eq!(p2.stock, 2);

    let customer = h.db().customers().get("cust-1", "biz-1").await.unwrap().unwrap();
    assert_eq!(customer.total_purchases_cents, 25_000);
    assert!(customer.last_purchase.is_some());

    let items = h.db().sales().get_items(&sale.id).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].line_total_cents, 20_000);
    assert_eq!(items[1].line_total_cents, 5_000);

    // Cash never touches the gateway
    assert!(h.gateway.pushes().is_empty());
}

#[tokio::test]
async fn insufficient_stock_rolls_back_the_whole_sale() {
    let h = Harness::new().await;

    let request = CreateSaleRequest {
        customer_id: "cust-1".to_string(),
        method: PaymentMethod::Cash,
        items: vec![
            LineItemRequest {
                product_id: "prod-1".to_string(),
                quantity: 2,
            },
            // Only 3 in stock
            LineItemRequest {
                product_id: "prod-2".to_string(),
                quantity: 4,
            },
        ],
    };

    let err = h.service().create_sale(&h.scope(), request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert!(err.message.contains("Sugar 1kg"));

    // The first item's reservation rolled back with everything else
    let p1 = h.db().products().get("prod-1", "biz-1").await.unwrap().unwrap();
    let p2 = h.db().products().get("prod-2", "biz-1").await.unwrap().unwrap();
    assert_eq!(p1.stock, 5);
    assert_eq!(p2.stock, 3);

    assert_eq!(h.db().sales().count("biz-1").await.unwrap(), 0);

    let customer = h.db().customers().get("cust-1", "biz-1").await.unwrap().unwrap();
    assert_eq!(customer.total_purchases_cents, 0);
}

#[tokio::test]
async fn concurrent_sales_never_oversell_the_last_units() {
    let h = Harness::new().await;

    // prod-2 has 3 in stock; two buyers race for 2 units each
    let request = CreateSaleRequest {
        customer_id: "cust-1".to_string(),
        method: PaymentMethod::Cash,
        items: vec![LineItemRequest {
            product_id: "prod-2".to_string(),
            quantity: 2,
        }],
    };

    let service = h.service();
    let scope = h.scope();
    let (a, b) = tokio::join!(
        service.create_sale(&scope, request.clone()),
        service.create_sale(&scope, request.clone()),
    );

    let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);

    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert_eq!(loser.code, ErrorCode::InsufficientStock);

    let p2 = h.db().products().get("prod-2", "biz-1").await.unwrap().unwrap();
    assert_eq!(p2.stock, 1);
}

#[tokio::test]
async fn unknown_customer_is_rejected_before_any_write() {
    let h = Harness::new().await;

    let request = CreateSaleRequest {
        customer_id: "cust-missing".to_string(),
        method: PaymentMethod::Cash,
        items: vec![LineItemRequest {
            product_id: "prod-1".to_string(),
            quantity: 1,
        }],
    };

    let err = h.service().create_sale(&h.scope(), request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(h.db().sales().count("biz-1").await.unwrap(), 0);
}

#[tokio::test]
async fn cross_tenant_product_reads_as_missing() {
    let h = Harness::new().await;

    let scope = TenantScope {
        business_id: "biz-other".to_string(),
        user_id: None,
    };

    let err = h
        .service()
        .create_sale(&scope, two_item_request(PaymentMethod::Cash))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

// =============================================================================
// Mobile Money: Dispatch
// =============================================================================

#[tokio::test]
async fn mobile_money_sale_stays_pending_until_callback() {
    let h = Harness::new().await;

    let sale = h
        .service()
        .create_sale(&h.scope(), two_item_request(PaymentMethod::MobileMoney))
        .await
        .unwrap();
    assert_eq!(sale.status, SaleStatus::Pending);

    // Stock reserved up front, ledger untouched while pending
    let p1 = h.db().products().get("prod-1", "biz-1").await.unwrap().unwrap();
    assert_eq!(p1.stock, 3);
    let customer = h.db().customers().get("cust-1", "biz-1").await.unwrap().unwrap();
    assert_eq!(customer.total_purchases_cents, 0);

    h.service().dispatch_stk_push(&sale).await.unwrap();

    let stored = h.db().sales().get(&sale.id, "biz-1").await.unwrap().unwrap();
    assert_eq!(stored.status, SaleStatus::Pending);
    assert_eq!(stored.checkout_ref.as_deref(), Some("ws_CO_TEST_0"));

    // The push carried the merchant-facing references
    let pushes = h.gateway.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].account_reference, format!("PAY-{}", sale.id));
    assert_eq!(pushes[0].amount.cents(), 25_000);
}

#[tokio::test]
async fn dispatch_failure_fails_sale_and_keeps_stock_reserved() {
    let h = Harness::new().await;
    h.gateway.fail_next();

    let sale = h
        .service()
        .create_sale(&h.scope(), two_item_request(PaymentMethod::MobileMoney))
        .await
        .unwrap();

    h.service().dispatch_stk_push(&sale).await.unwrap();

    let stored = h.db().sales().get(&sale.id, "biz-1").await.unwrap().unwrap();
    assert_eq!(stored.status, SaleStatus::Failed);
    assert!(stored.checkout_ref.is_none());

    // Stock stays decremented; restocking is a manual follow-up
    let p1 = h.db().products().get("prod-1", "biz-1").await.unwrap().unwrap();
    assert_eq!(p1.stock, 3);

    let customer = h.db().customers().get("cust-1", "biz-1").await.unwrap().unwrap();
    assert_eq!(customer.total_purchases_cents, 0);
}

// =============================================================================
// Mobile Money: Callback Reconciliation
// =============================================================================

#[tokio::test]
async fn success_callback_completes_exactly_once_under_replay() {
    let h = Harness::new().await;

    let sale = h
        .service()
        .create_sale(&h.scope(), two_item_request(PaymentMethod::MobileMoney))
        .await
        .unwrap();
    h.service().dispatch_stk_push(&sale).await.unwrap();

    let callback = success_callback("ws_CO_TEST_0", "NLJ7RT61SV");

    let outcome = h.service().reconcile_callback(&callback).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Completed);

    let stored = h.db().sales().get(&sale.id, "biz-1").await.unwrap().unwrap();
    assert_eq!(stored.status, SaleStatus::Completed);
    assert_eq!(stored.receipt_ref.as_deref(), Some("NLJ7RT61SV"));

    let customer = h.db().customers().get("cust-1", "biz-1").await.unwrap().unwrap();
    assert_eq!(customer.total_purchases_cents, 25_000);

    // Provider retries the same callback: acknowledged, nothing re-applied
    let replay = h.service().reconcile_callback(&callback).await.unwrap();
    assert_eq!(replay, ReconcileOutcome::AlreadyResolved);

    let customer = h.db().customers().get("cust-1", "biz-1").await.unwrap().unwrap();
    assert_eq!(customer.total_purchases_cents, 25_000);
}

#[tokio::test]
async fn failure_callback_fails_sale_without_ledger_movement() {
    let h = Harness::new().await;

    let sale = h
        .service()
        .create_sale(&h.scope(), two_item_request(PaymentMethod::MobileMoney))
        .await
        .unwrap();
    h.service().dispatch_stk_push(&sale).await.unwrap();

    let outcome = h
        .service()
        .reconcile_callback(&failure_callback("ws_CO_TEST_0"))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Failed);

    let stored = h.db().sales().get(&sale.id, "biz-1").await.unwrap().unwrap();
    assert_eq!(stored.status, SaleStatus::Failed);

    let customer = h.db().customers().get("cust-1", "biz-1").await.unwrap().unwrap();
    assert_eq!(customer.total_purchases_cents, 0);

    // A late success callback for the now-failed sale is a no-op
    let late = h
        .service()
        .reconcile_callback(&success_callback("ws_CO_TEST_0", "NLJ7RT61SV"))
        .await
        .unwrap();
    assert_eq!(late, ReconcileOutcome::AlreadyResolved);
    let stored = h.db().sales().get(&sale.id, "biz-1").await.unwrap().unwrap();
    assert_eq!(stored.status, SaleStatus::Failed);
}

#[tokio::test]
async fn unknown_checkout_reference_is_acknowledged_noop() {
    let h = Harness::new().await;

    let outcome = h
        .service()
        .reconcile_callback(&success_callback("ws_CO_NOBODY", "NLJ7RT61SV"))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Unknown);

    assert_eq!(h.db().sales().count("biz-1").await.unwrap(), 0);
}

// =============================================================================
// Low-Stock Notifications
// =============================================================================

#[tokio::test]
async fn low_stock_notification_priority_tracks_remaining_stock() {
    let h = Harness::new().await;

    // prod-2: stock 3, threshold 2. Selling 1 leaves 2 (= threshold, medium),
    // then selling the rest leaves 0 (high).
    let request = CreateSaleRequest {
        customer_id: "cust-1".to_string(),
        method: PaymentMethod::Cash,
        items: vec![LineItemRequest {
            product_id: "prod-2".to_string(),
            quantity: 1,
        }],
    };
    h.service().create_sale(&h.scope(), request).await.unwrap();

    let notifications = h
        .db()
        .notifications()
        .list_for_user("user-1", false)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].priority,
        biashara_core::NotificationPriority::Medium
    );
    assert!(notifications[0].message.contains("Sugar 1kg"));

    let request = CreateSaleRequest {
        customer_id: "cust-1".to_string(),
        method: PaymentMethod::Cash,
        items: vec![LineItemRequest {
            product_id: "prod-2".to_string(),
            quantity: 2,
        }],
    };
    h.service().create_sale(&h.scope(), request).await.unwrap();

    let notifications = h
        .db()
        .notifications()
        .list_for_user("user-1", false)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 2);
    let sold_out = notifications
        .iter()
        .find(|n| n.message.contains("0 units"))
        .unwrap();
    assert_eq!(sold_out.priority, biashara_core::NotificationPriority::High);
}

// =============================================================================
// HTTP Surface
// =============================================================================

#[tokio::test]
async fn http_cash_sale_roundtrip() {
    let h = Harness::new().await;
    let app = build_router(h.state.clone());

    let body = json!({
        "customer_id": "cust-1",
        "method": "cash",
        "items": [
            { "product_id": "prod-1", "quantity": 2 },
            { "product_id": "prod-2", "quantity": 1 }
        ]
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sales")
                .header("content-type", "application/json")
                .header("x-business-id", "biz-1")
                .header("x-user-id", "user-1")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let sale: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(sale["amount_cents"], 25_000);
    assert_eq!(sale["status"], "completed");
}

#[tokio::test]
async fn http_missing_business_header_is_rejected() {
    let h = Harness::new().await;
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/products")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn http_callback_always_acknowledges() {
    let h = Harness::new().await;
    let app = build_router(h.state.clone());

    let body = json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_NOBODY",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": { "Item": [] }
            }
        }
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payments/callback")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let ack: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(ack["status"], "success");
}

#[tokio::test]
async fn http_health_reports_database() {
    let h = Harness::new().await;
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["database"], true);
}
