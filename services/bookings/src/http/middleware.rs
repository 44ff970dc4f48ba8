//! Bearer-token middleware for the protected routes

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::http::error::ApiError;
use crate::state::AppState;

/// Resolve the caller and store its [`Identity`](crate::auth::Identity) in the request extensions
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let identity = state.authorizer.authorize(header.as_deref()).await?;
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
