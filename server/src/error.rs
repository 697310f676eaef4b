use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use shiptrack::{AdminError, AuthError, TrackingError, ValidationError};

use crate::routes::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn auth_status(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidCredentials | AuthError::NotSignedIn => StatusCode::UNAUTHORIZED,
        AuthError::NoRoleRecord | AuthError::UnauthorizedRole => StatusCode::FORBIDDEN,
        AuthError::UnknownAccount(_) => StatusCode::NOT_FOUND,
        AuthError::EmailInUse(_) => StatusCode::CONFLICT,
        AuthError::InvalidResetToken | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::Mailer(_) => StatusCode::BAD_GATEWAY,
        AuthError::PasswordHash(_) | AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn validation_status(error: &ValidationError) -> StatusCode {
    match error {
        ValidationError::StatusRegression { .. } => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    }
}

const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again.";

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Validation(e) => (validation_status(e), e.to_string()),
            ApiError::Auth(e) => (auth_status(e), e.user_message()),
            // The shipment changed; tell the caller exactly that.
            ApiError::Tracking(e) if e.is_partial() => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Tracking(e) => match e {
                TrackingError::Validation(v) => (validation_status(v), v.to_string()),
                TrackingError::Auth(a) => (auth_status(a), a.user_message()),
                TrackingError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                TrackingError::HistoryWriteFailed { .. } | TrackingError::Store(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
                }
            },
            ApiError::Admin(e) => match e {
                AdminError::Validation(v) => (validation_status(v), v.to_string()),
                AdminError::Auth(a) => (auth_status(a), a.user_message()),
                AdminError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                AdminError::Store(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
                }
            },
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }

        (status, Json(ApiResponse::<()>::err(message))).into_response()
    }
}
