//! Product handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use biashara_core::{validation, CoreError, Product, DEFAULT_LOW_STOCK_THRESHOLD};
use biashara_db::generate_id;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tenant::TenantScope;

/// Request body for `POST /api/products`.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    pub low_stock_threshold: Option<i64>,
}

/// Request body for `PUT /api/products/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub low_stock_threshold: Option<i64>,
}

/// `POST /api/products`
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Json(request): Json<CreateProductRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_name(&request.name)?;
    validation::validate_price_cents(request.price_cents)?;
    validation::validate_stock(request.stock)?;

    state.db.businesses().require(&scope.business_id).await?;

    let now = Utc::now();
    let product = Product {
        id: generate_id(),
        business_id: scope.business_id.clone(),
        name: request.name,
        category: request.category,
        price_cents: request.price_cents,
        stock: request.stock,
        low_stock_threshold: request
            .low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        created_at: now,
        updated_at: now,
    };

    let product = state.db.products().insert(&product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /api/products`
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state.db.products().list(&scope.business_id).await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}`
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state
        .db
        .products()
        .get(&id, &scope.business_id)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::ProductNotFound(id.clone())))?;

    Ok(Json(product))
}

/// `PUT /api/products/{id}`
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Path(id): Path<String>,
    Json(request): Json<UpdateProductRequest>,
) -> ApiResult<Json<Product>> {
    validation::validate_name(&request.name)?;
    validation::validate_price_cents(request.price_cents)?;

    let mut product = state
        .db
        .products()
        .get(&id, &scope.business_id)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::ProductNotFound(id.clone())))?;

    product.name = request.name;
    product.category = request.category;
    product.price_cents = request.price_cents;
    if let Some(threshold) = request.low_stock_threshold {
        product.low_stock_threshold = threshold;
    }

    state.db.products().update(&product).await?;

    // Re-read for the fresh updated_at
    let product = state
        .db
        .products()
        .get(&id, &scope.business_id)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::ProductNotFound(id)))?;

    Ok(Json(product))
}

/// `DELETE /api/products/{id}`
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.db.products().delete(&id, &scope.business_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
