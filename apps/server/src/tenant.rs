//! # Tenant Scope Extraction
//!
//! Every tenant-owned resource is addressed relative to a business, and
//! notifications relative to a user. Authentication happens upstream
//! (reverse proxy / API gateway); this server trusts the identity headers
//! it is handed and turns them into an explicit [`TenantScope`] value that
//! is threaded through every workflow call.
//!
//! ## Headers
//! ```text
//! X-Business-Id: 7c9e6679-7425-40de-944b-e07fc1f90ae7
//! X-User-Id:     9b2c8f10-1b2d-4e5f-8a6b-3c4d5e6f7a8b
//! ```
//!
//! A request without `X-Business-Id` is rejected before any handler runs.
//! `X-User-Id` is optional for sales/product/customer routes and required
//! only where a handler actually needs a user (notifications).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::{ApiError, ErrorCode};

/// Identity of the calling tenant, extracted from request headers.
#[derive(Debug, Clone)]
pub struct TenantScope {
    /// The business every lookup and write is scoped to.
    pub business_id: String,

    /// The acting user, when the upstream proxy supplied one.
    pub user_id: Option<String>,
}

impl TenantScope {
    /// Returns the user ID or a validation error for user-addressed routes.
    pub fn require_user(&self) -> Result<&str, ApiError> {
        self.user_id.as_deref().ok_or_else(|| {
            ApiError::new(ErrorCode::ValidationError, "Missing X-User-Id header")
        })
    }
}

impl<S> FromRequestParts<S> for TenantScope
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let business_id = header_value(parts, "x-business-id")?.ok_or_else(|| {
            ApiError::new(ErrorCode::ValidationError, "Missing X-Business-Id header")
        })?;

        let user_id = header_value(parts, "x-user-id")?;

        Ok(TenantScope {
            business_id,
            user_id,
        })
    }
}

fn header_value(parts: &Parts, name: &str) -> Result<Option<String>, ApiError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let s = value.to_str().map_err(|_| {
                ApiError::new(
                    ErrorCode::ValidationError,
                    format!("Invalid {name} header encoding"),
                )
            })?;
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(s.to_string()))
            }
        }
    }
}
