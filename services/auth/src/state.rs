//! Application state shared across handlers

use common::revocation::RevocationList;
use sqlx::PgPool;

use crate::{
    jwt::JwtService, rate_limiter::RateLimiter, repositories::UserRepository,
    session::SessionManager,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub sessions: SessionManager,
    pub revocations: RevocationList,
    pub rate_limiter: RateLimiter,
}
