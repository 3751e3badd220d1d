use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use common::errors::AppError;
use tracing::debug;

use crate::handlers::AppState;

/// Validate the caller's bearer token before any search runs.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::auth("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::auth("Invalid Authorization header format"))?;

    let claims = state.verifier.verify(token)?;
    debug!(caller = %claims.sub, "Caller token accepted");

    // Insert claims into request extensions for handlers to access
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
