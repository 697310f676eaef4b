//! HTTP routes.
//!
//! Routes are organized by audience:
//! - `auth` - Login, logout, password reset, current user
//! - `public` - Shipment lookup for customers, no session required
//! - `employee` - Shipment listing and status updates
//! - `admin` - Deletion, history, live feed, employee management

pub mod admin;
pub mod auth;
pub mod employee;
pub mod public;

use axum::Json;
use axum::Router;
use serde::Serialize;

use shiptrack::Services;

use crate::error::ApiError;

/// Response wrapper for API calls.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub(crate) fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

pub fn router() -> Router<Services> {
    Router::new()
        .merge(auth::router())
        .merge(public::router())
        .merge(employee::router())
        .merge(admin::router())
}
