//! # Service Layer
//!
//! Workflow orchestration between the HTTP routes and the repositories.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  routes      HTTP extraction, response shaping                          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  services    Transactions, gateway calls, notification fan-out          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  biashara-db Repositories (single statements, tenant scoping)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Services own transaction boundaries. Repositories never open their own
//! transactions for multi-statement workflows, and routes never touch SQL.

pub mod notification;
pub mod sale;

pub use notification::NotificationService;
pub use sale::SaleService;
