//! Middleware for JWT token validation and admin checks

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use common::token::{TokenType, bearer_token};
use tracing::{error, warn};

use crate::{error::ApiError, state::AppState};

/// The caller of an authenticated request
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub is_admin: bool,
}

/// Validate the bearer access token and store the [`Caller`] in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned)
        .ok_or_else(|| ApiError::Unauthorized("missing token".to_string()))?;

    let claims = state.jwt_service.validate_token(&token).map_err(|e| {
        warn!("Failed to validate token: {}", e);
        ApiError::Unauthorized("invalid token".to_string())
    })?;
    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("invalid token".to_string()));
    }

    let revoked = state.revocations.is_revoked(&token).await.map_err(|e| {
        error!("Failed to check token revocation: {}", e);
        ApiError::Internal(e.to_string())
    })?;
    if revoked {
        return Err(ApiError::Unauthorized("invalid token".to_string()));
    }

    req.extensions_mut().insert(Caller {
        user_id: claims.sub,
        is_admin: claims.admin,
    });

    Ok(next.run(req).await)
}

/// Reject callers without the admin claim; runs after [`auth_middleware`]
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let caller = req
        .extensions()
        .get::<Caller>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("missing token".to_string()))?;

    if !caller.is_admin {
        warn!("Non-admin {} denied access to {}", caller.user_id, req.uri().path());
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(req).await)
}
