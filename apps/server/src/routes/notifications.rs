//! Notification handlers.
//!
//! Notification routes are user-addressed: they require `X-User-Id` on top
//! of the usual `X-Business-Id`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use biashara_core::Notification;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tenant::TenantScope;

/// Query parameters for `GET /api/notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    /// When true, only unread notifications are returned.
    #[serde(default)]
    pub unread: bool,
}

/// `GET /api/notifications`
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let user_id = scope.require_user()?;

    let notifications = state
        .db
        .notifications()
        .list_for_user(user_id, query.unread)
        .await?;

    Ok(Json(notifications))
}

/// `PUT /api/notifications/{id}/read`
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user_id = scope.require_user()?;

    let marked = state.db.notifications().mark_read(&id, user_id).await?;
    if !marked {
        return Err(ApiError::not_found(format!("Notification not found: {id}")));
    }

    Ok(Json(json!({ "read": true })))
}

/// `PUT /api/notifications/read-all`
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
) -> ApiResult<Json<Value>> {
    let user_id = scope.require_user()?;

    let count = state.db.notifications().mark_all_read(user_id).await?;

    Ok(Json(json!({ "marked": count })))
}
