//! # Notification Service
//!
//! Best-effort notification emission for workflow events.
//!
//! ## Best-Effort Contract
//! Every method here swallows its own failures: a notification that cannot
//! be written is logged and dropped, and the request that triggered it
//! still succeeds. Nothing in the sale workflow waits on this module.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use biashara_core::{Notification, NotificationCategory, NotificationPriority, Sale};
use biashara_db::generate_id;

use crate::state::AppState;

/// Emits in-app notifications for workflow events.
#[derive(Clone)]
pub struct NotificationService {
    state: Arc<AppState>,
}

impl NotificationService {
    /// Creates a new NotificationService.
    pub fn new(state: Arc<AppState>) -> Self {
        NotificationService { state }
    }

    /// Emits a low-stock alert for a product after a sale commits.
    ///
    /// ## Priority
    /// * stock == 0 → high (sold out, merchant must restock now)
    /// * stock > 0  → medium (approaching the threshold)
    pub async fn notify_low_stock(&self, recipient: &str, product_name: &str, stock: i64) {
        let notification = Notification {
            id: generate_id(),
            user_id: recipient.to_string(),
            category: NotificationCategory::LowStock,
            title: "Low Stock Alert".to_string(),
            message: format!("{product_name} is running low ({stock} units remaining)"),
            priority: NotificationPriority::for_stock_level(stock),
            read: false,
            created_at: Utc::now(),
        };

        self.insert_best_effort(notification).await;
    }

    /// Emits a payment-received notification when a sale completes.
    pub async fn notify_payment_received(&self, recipient: &str, sale: &Sale) {
        let notification = Notification {
            id: generate_id(),
            user_id: recipient.to_string(),
            category: NotificationCategory::Payment,
            title: "Payment Received".to_string(),
            message: format!("Payment of {} received for sale {}", sale.amount(), sale.id),
            priority: NotificationPriority::Medium,
            read: false,
            created_at: Utc::now(),
        };

        self.insert_best_effort(notification).await;
    }

    async fn insert_best_effort(&self, notification: Notification) {
        match self.state.db.notifications().insert(&notification).await {
            Ok(_) => {
                debug!(
                    recipient = %notification.user_id,
                    title = %notification.title,
                    "Notification emitted"
                );
            }
            Err(e) => {
                warn!(error = %e, title = %notification.title, "Failed to emit notification");
            }
        }
    }
}
