//! # Domain Types
//!
//! Core domain types used throughout Biashara Pro.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  business_id    │   │  business_id    │   │  business_id    │       │
//! │  │  price_cents    │   │  customer_id    │   │  phone          │       │
//! │  │  stock          │   │  status/method  │   │  total_purchases│       │
//! │  └─────────────────┘   │  transaction_ref│   └─────────────────┘       │
//! │                        └────────┬────────┘                              │
//! │                                 │ 1-N                                   │
//! │                        ┌────────┴────────┐   ┌─────────────────┐       │
//! │                        │    SaleItem     │   │  Notification   │       │
//! │                        │  quantity       │   │  category       │       │
//! │                        │  unit_price     │   │  priority       │       │
//! │                        │  line_total     │   │  read flag      │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity Pattern
//! Every entity has a UUID v4 `id` and references other entities by id value
//! only, never by owning object pointer. Relationships are resolved through
//! explicit repository lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Business (tenant)
// =============================================================================

/// A business: the tenant-isolation boundary.
///
/// Every product, customer, and sale belongs to exactly one business, and
/// every query filters by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Business {
    pub id: String,
    pub name: String,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business this product belongs to.
    pub business_id: String,

    /// Display name.
    pub name: String,

    /// Free-form category label.
    pub category: String,

    /// Unit price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Current stock level. Never driven below zero by the sale workflow.
    pub stock: i64,

    /// Stock level at or below which a low-stock alert is emitted.
    pub low_stock_threshold: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether current stock is at or below the alert threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer of a business, with a running purchase ledger.
///
/// `total_purchases_cents` and `last_purchase` change if and only if a sale
/// reaches the `completed` status. Pending and failed sales leave them
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub business_id: String,
    pub name: String,
    /// Contact phone, stored as entered; normalized at gateway submission.
    pub phone: String,
    pub email: Option<String>,
    /// Lifetime total of completed sales, in cents.
    pub total_purchases_cents: i64,
    /// Completion time of the most recent completed sale.
    pub last_purchase: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the lifetime purchase total as Money.
    #[inline]
    pub fn total_purchases(&self) -> Money {
        Money::from_cents(self.total_purchases_cents)
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// ## Lifecycle
/// ```text
/// pending ──► completed   (cash: same transaction; mobile money: callback)
///    │
///    └─────► failed      (gateway dispatch error or failure callback)
/// ```
/// `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Awaiting payment confirmation.
    Pending,
    /// Paid; customer ledger has been updated.
    Completed,
    /// Payment failed; ledger untouched.
    Failed,
}

impl SaleStatus {
    /// Checks whether the status admits no further transitions.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Completed | SaleStatus::Failed)
    }

    /// Lowercase wire/storage form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Failed => "failed",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; the sale completes synchronously.
    Cash,
    /// Mobile-money push; the sale completes asynchronously via callback.
    MobileMoney,
}

impl PaymentMethod {
    /// Lowercase wire/storage form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::MobileMoney => "mobile_money",
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A customer transaction comprising one or more line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub business_id: String,
    pub customer_id: String,
    /// Total amount in cents: the sum of line totals.
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: SaleStatus,
    /// Opaque reference generated at creation; unique across all sales.
    pub transaction_ref: String,
    /// Provider checkout reference, stored after push initiation succeeds.
    /// Callback reconciliation matches on this value.
    pub checkout_ref: Option<String>,
    /// Provider receipt reference, stored on completion.
    pub receipt_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the sale amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// Immutable once created: `unit_price_cents` is the product price at sale
/// time and does not follow later price changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Quantity sold (always positive).
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Notification
// =============================================================================

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// A product crossed its low-stock threshold.
    LowStock,
    /// A payment completed or failed.
    Payment,
    /// System-originated message.
    System,
    /// Team role invitation.
    RoleInvite,
}

/// Priority of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    High,
    Medium,
    Low,
}

impl NotificationPriority {
    /// Priority for a low-stock alert: `high` when the shelf is empty,
    /// `medium` otherwise.
    #[inline]
    pub const fn for_stock_level(stock: i64) -> Self {
        if stock == 0 {
            NotificationPriority::High
        } else {
            NotificationPriority::Medium
        }
    }
}

/// An alert recorded for later user consumption.
///
/// Append-only from the sale workflow's perspective; only the `read` flag
/// mutates afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: String,
    /// Target user.
    pub user_id: String,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
