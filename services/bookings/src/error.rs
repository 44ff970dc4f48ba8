//! Error taxonomy of the booking core
//!
//! These types carry no transport concerns; `http::error` maps them to
//! status codes.

use thiserror::Error;
use uuid::Uuid;

use crate::repositories::StoreError;

/// Why a caller was turned away by the authorization gate
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No usable `Authorization: Bearer` header
    #[error("missing token")]
    MissingToken,

    /// Token failed verification (malformed, bad signature, expired, revoked)
    #[error("invalid token")]
    InvalidToken,

    /// Authenticated, but not allowed to perform the operation
    #[error("forbidden")]
    Forbidden,
}

/// Errors returned by booking operations
#[derive(Error, Debug)]
pub enum BookingError {
    /// Caller-supplied input missing or malformed
    #[error("{0}")]
    Validation(String),

    /// An active booking already holds the desk for that day
    #[error("desk already booked for this day (existing booking {existing_id})")]
    Conflict { existing_id: Uuid },

    /// A single-resource lookup matched nothing
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Unexpected failure of a collaborator; the detail is for logs only
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { existing_id } => BookingError::Conflict { existing_id },
            other => BookingError::Internal(other.to_string()),
        }
    }
}

/// Type alias for booking results
pub type BookingResult<T> = Result<T, BookingError>;
