//! Payment handlers: the provider callback webhook and the status poll.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::ApiResult;
use crate::gateway::{CallbackEnvelope, StkQueryResponse};
use crate::services::SaleService;
use crate::state::AppState;
use crate::tenant::TenantScope;

/// `POST /api/payments/callback`
///
/// The provider's result webhook. The response body is always
/// `{"status": "success"|"failed"}` mirroring the payment outcome;
/// reconciliation problems are logged, never surfaced to the provider.
pub async fn callback(State(state): State<Arc<AppState>>, Json(payload): Json<Value>) -> Response {
    let envelope: CallbackEnvelope = match serde_json::from_value(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(error = %e, "Malformed payment callback");
            let body = Json(json!({
                "status": "failed",
                "message": "Malformed callback payload",
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }
    };

    let stk_callback = envelope.body.stk_callback;

    let (status, message) = if stk_callback.is_success() {
        ("success", "Payment processed successfully")
    } else {
        ("failed", "Payment failed")
    };

    let service = SaleService::new(state);
    match service.reconcile_callback(&stk_callback).await {
        Ok(outcome) => {
            debug!(?outcome, checkout_ref = %stk_callback.checkout_request_id, "Callback reconciled");
        }
        Err(e) => {
            error!(
                checkout_ref = %stk_callback.checkout_request_id,
                error = %e,
                "Callback reconciliation failed"
            );
        }
    }

    Json(json!({ "status": status, "message": message })).into_response()
}

/// `GET /api/payments/{id}/status`
///
/// Opportunistic provider-side status poll for a sale's push. The database
/// is not updated from the poll result.
pub async fn push_status(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Path(id): Path<String>,
) -> ApiResult<Json<StkQueryResponse>> {
    let service = SaleService::new(state);
    let response = service.query_push_status(&scope, &id).await?;
    Ok(Json(response))
}
