//! Customer handlers.
//!
//! Phone numbers are normalized to canonical 254 form on the way in, so
//! the gateway never sees a local-format number.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use biashara_core::phone::normalize_phone;
use biashara_core::{validation, CoreError, Customer};
use biashara_db::generate_id;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tenant::TenantScope;

/// Request body for `POST /api/customers`.
#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// Request body for `PUT /api/customers/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// `POST /api/customers`
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Json(request): Json<CreateCustomerRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_name(&request.name)?;
    let phone = normalize_phone(&request.phone)?;

    state.db.businesses().require(&scope.business_id).await?;

    let customer = Customer {
        id: generate_id(),
        business_id: scope.business_id.clone(),
        name: request.name,
        phone,
        email: request.email,
        total_purchases_cents: 0,
        last_purchase: None,
        created_at: Utc::now(),
    };

    let customer = state.db.customers().insert(&customer).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// `GET /api/customers`
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
) -> ApiResult<Json<Vec<Customer>>> {
    let customers = state.db.customers().list(&scope.business_id).await?;
    Ok(Json(customers))
}

/// `GET /api/customers/{id}`
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .db
        .customers()
        .get(&id, &scope.business_id)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::CustomerNotFound(id.clone())))?;

    Ok(Json(customer))
}

/// `PUT /api/customers/{id}`
pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Path(id): Path<String>,
    Json(request): Json<UpdateCustomerRequest>,
) -> ApiResult<Json<Customer>> {
    validation::validate_name(&request.name)?;
    let phone = normalize_phone(&request.phone)?;

    let mut customer = state
        .db
        .customers()
        .get(&id, &scope.business_id)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::CustomerNotFound(id.clone())))?;

    customer.name = request.name;
    customer.phone = phone;
    customer.email = request.email;

    state.db.customers().update(&customer).await?;

    Ok(Json(customer))
}

/// `DELETE /api/customers/{id}`
pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    scope: TenantScope,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.db.customers().delete(&id, &scope.business_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
