//! Mapping of booking errors onto HTTP responses

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::error::{AuthError, BookingError};

/// Error returned by handlers; renders as `{"error": msg}`
#[derive(Debug)]
pub struct ApiError(pub BookingError);

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(BookingError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            BookingError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            BookingError::Conflict { existing_id } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "desk already booked for this day",
                    "existingBookingId": existing_id,
                }),
            ),
            BookingError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            BookingError::Auth(err) => {
                let status = match err {
                    AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                    AuthError::Forbidden => StatusCode::FORBIDDEN,
                };
                (status, json!({ "error": err.to_string() }))
            }
            BookingError::Internal(detail) => {
                error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for handler results
pub type ApiResult<T> = Result<T, ApiError>;
