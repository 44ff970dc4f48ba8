//! HTTP surface of the bookings service

pub mod error;
pub mod middleware;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
