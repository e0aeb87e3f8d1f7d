//! # Repository Module
//!
//! Database repository implementations for Biashara Pro.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Request Handler                                                       │
//! │       │                                                                 │
//! │       │  db.products().list(&business_id)                              │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list(&self, business_id)                                          │
//! │  ├── get(&self, id, business_id)                                       │
//! │  ├── insert(&self, product)                                            │
//! │  └── reserve_stock(&self, tx, id, business_id, qty)                    │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (in-memory database)                                   │
//! │  • SQL is isolated in one place                                        │
//! │  • Tenant scoping lives in one layer                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tenant Scoping
//!
//! Every read and write that touches tenant-owned data takes an explicit
//! `business_id`. A row that belongs to another business is treated exactly
//! like a row that does not exist.
//!
//! ## Available Repositories
//!
//! - [`BusinessRepository`] - Business account records
//! - [`ProductRepository`] - Product CRUD and stock reservation
//! - [`CustomerRepository`] - Customer CRUD and purchase ledger
//! - [`SaleRepository`] - Sale lifecycle and payment references
//! - [`NotificationRepository`] - In-app notification feed
//!
//! [`BusinessRepository`]: business::BusinessRepository
//! [`ProductRepository`]: product::ProductRepository
//! [`CustomerRepository`]: customer::CustomerRepository
//! [`SaleRepository`]: sale::SaleRepository
//! [`NotificationRepository`]: notification::NotificationRepository

pub mod business;
pub mod customer;
pub mod notification;
pub mod product;
pub mod sale;

use uuid::Uuid;

/// Generates a new entity ID.
///
/// ## Usage
/// ```rust,ignore
/// let id = generate_id();
/// let product = Product { id, ... };
/// ```
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
