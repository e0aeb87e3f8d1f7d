//! # biashara-server: HTTP API for Biashara Pro
//!
//! Axum HTTP server tying the pure core and the database layer together,
//! plus the M-Pesa gateway adapter.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Biashara Pro Server                              │
//! │                                                                         │
//! │  Merchant app ──► HTTP (8000) ──► routes ──► services ──► biashara-db  │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                                  gateway (M-Pesa)                       │
//! │                                       ▲                                 │
//! │  Provider ────► POST /api/payments/callback ──────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The library crate exposes everything integration tests need: the router
//! builder, the shared state, the services, and the gateway trait.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod services;
pub mod state;
pub mod tenant;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::{MpesaConfig, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use gateway::{MpesaGateway, PaymentGateway};
pub use routes::build_router;
pub use state::AppState;
