//! # biashara-db: Database Layer for Biashara Pro
//!
//! This crate handles all SQLite database operations: connection pooling,
//! schema migrations, and repository implementations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Biashara Pro Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (axum)                              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              biashara-core (Pure Business Logic)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ biashara-db (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌────────────┐  ┌──────────────────────────┐  │   │
//! │  │   │   pool   │  │ migrations │  │      repositories        │  │   │
//! │  │   │ Database │  │  embedded  │  │ business product customer│  │   │
//! │  │   │ DbConfig │  │    SQL     │  │   sale notification      │  │   │
//! │  │   └──────────┘  └────────────┘  └──────────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │                        SQLite (WAL mode)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use biashara_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("/var/lib/biashara/biashara.db")).await?;
//!
//! let products = db.products().list(&business_id).await?;
//!
//! // Multi-statement workflow steps share one transaction
//! let mut tx = db.begin().await?;
//! db.sales().insert_sale(&mut tx, &sale).await?;
//! db.products().reserve_stock(&mut tx, &id, &business_id, 2).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::business::BusinessRepository;
pub use repository::customer::CustomerRepository;
pub use repository::generate_id;
pub use repository::notification::NotificationRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
