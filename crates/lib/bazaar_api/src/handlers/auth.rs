//! Authentication request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use bazaar_core::auth::Logout;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest, RegisterRequest, TokenResponse,
    UserResponse,
};

fn required(value: &str, message: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(())
}

/// Access token lifetime in seconds, reported as `expiresIn`.
fn access_expires_in(state: &AppState) -> i64 {
    state.authority.config().access_ttl.num_seconds()
}

/// `POST /auth/register`: create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .authority
        .register(
            &body.email,
            &body.nickname,
            &body.password,
            body.image.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    required(&body.email, "email and password are required")?;
    required(&body.password, "email and password are required")?;

    let session = state.authority.login(&body.email, &body.password).await?;
    Ok(Json(TokenResponse::from_session(
        session,
        access_expires_in(&state),
    )))
}

/// `POST /auth/refresh`: exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    required(&body.refresh_token, "refreshToken is required")?;

    let session = state.authority.refresh(&body.refresh_token).await?;
    Ok(Json(TokenResponse::from_session(
        session,
        access_expires_in(&state),
    )))
}

/// `POST /auth/logout`: revoke one refresh token, or every session of the
/// authenticated caller when `allDevices` is set.
pub async fn logout_handler(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    Json(body): Json<LogoutRequest>,
) -> AppResult<Json<LogoutResponse>> {
    let caller = user.as_ref().map(|Extension(u)| &u.0);

    let revoked = if body.all_devices {
        state.authority.logout(Logout::AllDevices, caller).await?
    } else {
        let refresh_token = body
            .refresh_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Validation("refreshToken is required".into()))?;
        state
            .authority
            .logout(Logout::Session { refresh_token }, caller)
            .await?
    };

    Ok(Json(LogoutResponse {
        success: true,
        revoked,
    }))
}
