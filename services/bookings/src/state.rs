//! Application state shared across handlers

use sqlx::PgPool;

use crate::auth::Authorizer;
use crate::service::BookingService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: BookingService,
    pub authorizer: Authorizer,
    /// Present when bookings live in Postgres; probed by `/health`
    pub db_pool: Option<PgPool>,
}
