//! Authentication middleware: Bearer token extraction and JWT verification.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use bazaar_core::auth::AuthError;
use bazaar_core::models::auth::TokenClaims;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Key used to store `TokenClaims` in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

impl AuthenticatedUser {
    /// Numeric user id from the `sub` claim.
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.0
            .user_id()
            .ok_or_else(|| AppError::from(AuthError::InvalidToken))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Unauthenticated)?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidToken)
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the JWT,
/// and injects `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let claims = state.authority.verify_access_token(token)?;
    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}

/// Axum middleware: like [`require_auth`] but never rejects. A missing or
/// invalid token leaves the request anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let verified = bearer_token(request.headers())
        .and_then(|token| state.authority.verify_access_token(token));
    match verified {
        Ok(claims) => {
            request.extensions_mut().insert(AuthenticatedUser(claims));
        }
        Err(AuthError::Unauthenticated) => {}
        Err(e) => debug!(kind = %e, "ignoring unusable bearer token"),
    }
    next.run(request).await
}
