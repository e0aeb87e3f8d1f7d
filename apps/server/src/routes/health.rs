//! Health check handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /api/health`
///
/// Liveness plus a database round trip. Always returns 200; the body says
/// whether the database answered.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database_ok = state.db.health_check().await;

    Json(json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "database": database_ok,
    }))
}
