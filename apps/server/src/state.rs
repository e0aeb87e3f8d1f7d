//! Shared application state.
//!
//! One `Arc<AppState>` is built at startup and cloned into every handler
//! and service. The gateway is held behind the [`PaymentGateway`] trait so
//! tests can swap in a scripted implementation.

use std::sync::Arc;

use biashara_db::Database;

use crate::config::ServerConfig;
use crate::gateway::PaymentGateway;

/// Shared application state.
pub struct AppState {
    /// Database handle (pooled, cheap to clone through).
    pub db: Database,

    /// Mobile-money gateway.
    pub gateway: Arc<dyn PaymentGateway>,

    /// Loaded configuration.
    pub config: ServerConfig,
}

impl AppState {
    /// Creates shared state from its parts.
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>, config: ServerConfig) -> Arc<Self> {
        Arc::new(AppState {
            db,
            gateway,
            config,
        })
    }
}
