//! Bookings service routes

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{
    auth::Identity,
    error::BookingError,
    http::{error::ApiResult, middleware::require_identity},
    models::{CancelBookingRequest, CreateBookingRequest, UpdateBookingRequest},
    state::AppState,
};

/// Create the router for the bookings service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/mine", get(my_bookings))
        .route("/bookings/name/:name", get(bookings_by_name))
        .route("/bookings/date/:date", get(bookings_by_date))
        .route(
            "/bookings/:id",
            get(get_booking).patch(update_booking).delete(delete_booking),
        )
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/auth/whoami", get(whoami))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_identity,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, database) = match &state.db_pool {
        Some(pool) => {
            if common::database::health_check(pool).await {
                (StatusCode::OK, "ok")
            } else {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
        }
        None => (StatusCode::OK, "not configured"),
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "bookings",
            "database": database,
        })),
    )
}

/// The verified caller
pub async fn whoami(Extension(caller): Extension<Identity>) -> impl IntoResponse {
    Json(caller)
}

/// Create a booking; `userId` defaults to the caller
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(mut request) = payload?;

    if request.user_id.is_none() {
        request.user_id = Some(caller.user_id.clone());
    }
    if let Some(owner) = request
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|owner| !owner.is_empty())
    {
        caller.require_self_or_admin(owner)?;
    }

    let booking = state.service.create_booking(request).await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list_bookings(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_all().await?))
}

pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_by_user(&caller.user_id).await?))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.get_by_id(id).await?))
}

pub async fn bookings_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_by_name(&name).await?))
}

pub async fn bookings_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_by_date(&date).await?))
}

/// Partial update; the owner or an admin, and only an admin may reassign
pub async fn update_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBookingRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;

    let current = state.service.get_by_id(id).await?;
    caller.require_self_or_admin(&current.user_id)?;
    // a blank owner is left for validation to reject
    if let Some(new_owner) = request.user_id.as_deref().map(str::trim) {
        if !new_owner.is_empty() && new_owner != current.user_id {
            caller.require_admin()?;
        }
    }

    Ok(Json(state.service.update_booking(id, request).await?))
}

/// Cancel a booking; the body `{reason}` is optional
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CancelBookingRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| BookingError::Validation(format!("invalid request body: {e}")))?
    };

    let current = state.service.get_by_id(id).await?;
    caller.require_self_or_admin(&current.user_id)?;

    Ok(Json(state.service.cancel_booking(id, request.reason).await?))
}

/// Hard delete, admins only
pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    state.service.delete_booking(id, &caller).await?;

    Ok(Json(json!({ "message": format!("booking {id} deleted") })))
}

fn parse_id(raw: &str) -> Result<Uuid, BookingError> {
    Uuid::parse_str(raw).map_err(|_| BookingError::Validation(format!("invalid booking id: {raw}")))
}
