//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use common::token::{TokenType, bearer_token};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{Caller, auth_middleware, require_admin},
    models::{CreateUserRequest, LoginRequest, NewUser, RefreshTokenRequest, TokenResponse, User},
    repositories::user::verify_password,
    state::AppState,
    validation::{validate_display_name, validate_email, validate_password},
};

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    // layers run bottom-up: identify the caller, then check the admin flag
    let admin_routes = Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/:id/admin", post(promote_user))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool).await;
    let redis = state.sessions.health_check().await.unwrap_or(false);
    let status = if database && redis {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "auth",
            "database": database,
            "redis": redis,
        })),
    )
}

async fn issue_tokens(state: &AppState, user: &User) -> ApiResult<TokenResponse> {
    let access_token = state.jwt_service.generate_access_token(user).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        ApiError::Internal(e.to_string())
    })?;
    let refresh_token = state.jwt_service.generate_refresh_token(user).map_err(|e| {
        error!("Failed to generate refresh token: {}", e);
        ApiError::Internal(e.to_string())
    })?;

    state.sessions.create_session(user.id, &refresh_token).await?;

    Ok(TokenResponse::bearer(
        access_token,
        refresh_token,
        state.jwt_service.access_token_expiry(),
    ))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();
    info!("Login attempt for user: {}", email);

    if !state.rate_limiter.is_allowed(&email).await {
        warn!("Login rate limit hit for {}", email);
        return Err(ApiError::TooManyRequests);
    }

    let user = state
        .user_repository
        .find_by_email(&email)
        .await?
        .filter(|user| verify_password(user, &payload.password))
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    state.rate_limiter.reset(&email).await;
    let tokens = issue_tokens(&state, &user).await?;

    info!("User {} logged in", user.id);
    Ok((StatusCode::OK, Json(tokens)))
}

/// Refresh token endpoint
///
/// The refresh token must be the user's current session. The user is re-read
/// so that a changed admin flag shows up in the new access token.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("invalid refresh token".to_string());

    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| invalid())?;
    if claims.token_type != TokenType::Refresh {
        return Err(invalid());
    }
    if state.revocations.is_revoked(&payload.refresh_token).await? {
        return Err(invalid());
    }

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| invalid())?;
    if !state
        .sessions
        .is_session_valid(user_id, &payload.refresh_token)
        .await?
    {
        warn!("Superseded refresh token presented for user {}", user_id);
        return Err(invalid());
    }

    let user = state
        .user_repository
        .find_by_id(user_id)
        .await?
        .ok_or_else(invalid)?;

    let access_token = state.jwt_service.generate_access_token(&user).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        ApiError::Internal(e.to_string())
    })?;
    let new_refresh_token = state
        .jwt_service
        .rotate_refresh_token(&state.revocations, &user, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to rotate refresh token: {}", e);
            ApiError::Internal(e.to_string())
        })?;
    state
        .sessions
        .create_session(user.id, &new_refresh_token)
        .await?;

    Ok((
        StatusCode::OK,
        Json(TokenResponse::bearer(
            access_token,
            new_refresh_token,
            state.jwt_service.access_token_expiry(),
        )),
    ))
}

/// Logout endpoint
///
/// Revokes the refresh token and, when one is presented, the bearer access
/// token, so the bookings service refuses it before it expires.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RefreshTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| ApiError::Unauthorized("invalid refresh token".to_string()))?;
    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized("invalid refresh token".to_string()));
    }

    revoke(&state, &payload.refresh_token, &claims).await?;

    let access_token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);
    if let Some(access_token) = access_token {
        if let Ok(access_claims) = state.jwt_service.validate_token(access_token) {
            if access_claims.sub == claims.sub {
                revoke(&state, access_token, &access_claims).await?;
            }
        }
    }

    if let Ok(user_id) = Uuid::parse_str(&claims.sub) {
        state.sessions.delete_session(user_id).await?;
    }

    info!("User {} logged out", claims.sub);
    Ok((
        StatusCode::OK,
        Json(json!({"message": "Logged out successfully"})),
    ))
}

async fn revoke(state: &AppState, token: &str, claims: &common::token::Claims) -> ApiResult<()> {
    state
        .jwt_service
        .revoke(&state.revocations, token, claims)
        .await
        .map_err(|e| {
            error!("Failed to revoke token: {}", e);
            ApiError::Internal(e.to_string())
        })
}

/// Register a user (admin only)
pub async fn create_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();
    validate_email(&email).map_err(ApiError::BadRequest)?;
    validate_password(&payload.password).map_err(ApiError::BadRequest)?;
    validate_display_name(&payload.display_name).map_err(ApiError::BadRequest)?;

    let user = state
        .user_repository
        .create(&NewUser {
            email,
            display_name: payload.display_name.trim().to_string(),
            password: payload.password,
            is_admin: payload.is_admin,
        })
        .await?;

    info!("Admin {} created user {}", caller.user_id, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// List users (admin only)
pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.user_repository.list().await?))
}

/// Grant the admin flag (admin only)
pub async fn promote_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .set_admin(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;

    info!("Admin {} promoted user {}", caller.user_id, user.id);
    Ok(Json(user))
}
