//! Sale handlers.
//!
//! Creation delegates to [`SaleService`]; for mobile-money sales the STK
//! dispatch is spawned here, explicitly after the creation transaction has
//! committed and the response is on its way back to the client.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use biashara_core::{CoreError, PaymentMethod, Sale, SaleItem, SaleStatus};

use crate::error::{ApiError, ApiResult};
use crate::services::SaleService;
use crate::state::AppState;
use crate::tenant::TenantScope;

/// Query parameters for `GET /api/sales`.
#[derive(Debug, Deserialize)]
pub struct SaleListQuery {
    pub status: Option<SaleStatus>,
    pub method: Option<PaymentMethod>,
}

/// Sale with its line items, returned by `GET /api/sales/{id}`.
#[derive(Debug, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// `POST /api/sales`
pub async fn create_sale(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Json(request): Json<crate::services::sale::CreateSaleRequest>,
) -> ApiResult<impl IntoResponse> {
    let service = SaleService::new(state);
    let sale = service.create_sale(&scope, request).await?;

    if sale.method == PaymentMethod::MobileMoney {
        let dispatch_sale = sale.clone();
        tokio::spawn(async move {
            if let Err(e) = service.dispatch_stk_push(&dispatch_sale).await {
                error!(sale_id = %dispatch_sale.id, error = %e, "STK dispatch task failed");
            }
        });
    }

    Ok((StatusCode::CREATED, Json(sale)))
}

/// `GET /api/sales`
pub async fn list_sales(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Query(query): Query<SaleListQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let sales = state
        .db
        .sales()
        .list(&scope.business_id, query.status, query.method)
        .await?;

    Ok(Json(sales))
}

/// `GET /api/sales/{id}`
pub async fn get_sale(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    let sale = state
        .db
        .sales()
        .get(&id, &scope.business_id)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::SaleNotFound(id.clone())))?;

    let items = state.db.sales().get_items(&sale.id).await?;

    Ok(Json(SaleDetail { sale, items }))
}
