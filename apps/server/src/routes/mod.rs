//! # HTTP Routes
//!
//! Route table and handler modules.
//!
//! ## Route Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         API Surface                                     │
//! │                                                                         │
//! │  POST   /api/sales                    Create a sale                     │
//! │  GET    /api/sales                    List sales (status/method filter) │
//! │  GET    /api/sales/{id}               Sale with line items              │
//! │                                                                         │
//! │  POST   /api/payments/callback        Provider result webhook          │
//! │  GET    /api/payments/{id}/status     Opportunistic push status poll    │
//! │                                                                         │
//! │  POST   /api/products                 Create product                    │
//! │  GET    /api/products                 List products                     │
//! │  GET    /api/products/{id}            Get product                      │
//! │  PUT    /api/products/{id}            Update product                   │
//! │  DELETE /api/products/{id}            Delete product                   │
//! │                                                                         │
//! │  POST   /api/customers                Create customer                  │
//! │  GET    /api/customers                List customers                   │
//! │  GET    /api/customers/{id}           Get customer                     │
//! │  PUT    /api/customers/{id}           Update customer                  │
//! │  DELETE /api/customers/{id}           Delete customer                  │
//! │                                                                         │
//! │  GET    /api/notifications            List notifications               │
//! │  PUT    /api/notifications/{id}/read  Mark one read                    │
//! │  PUT    /api/notifications/read-all   Mark all read                    │
//! │                                                                         │
//! │  GET    /api/health                   Liveness + database check        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All tenant-owned routes require the `X-Business-Id` header; the
//! notification routes additionally require `X-User-Id`. The payment
//! callback is the one unauthenticated, unscoped route.

pub mod customers;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod products;
pub mod sales;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/sales",
            post(sales::create_sale).get(sales::list_sales),
        )
        .route("/api/sales/{id}", get(sales::get_sale))
        .route("/api/payments/callback", post(payments::callback))
        .route("/api/payments/{id}/status", get(payments::push_status))
        .route(
            "/api/products",
            post(products::create_product).get(products::list_products),
        )
        .route(
            "/api/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/api/customers",
            post(customers::create_customer).get(customers::list_customers),
        )
        .route(
            "/api/customers/{id}",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/{id}/read",
            put(notifications::mark_read),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_read),
        )
        .route("/api/health", get(health::health))
        .with_state(state)
}
