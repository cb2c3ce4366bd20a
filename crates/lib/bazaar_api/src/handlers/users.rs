//! Handlers for the authenticated user's own account.

use axum::extract::State;
use axum::{Extension, Json};
use bazaar_core::models::auth::ProfileUpdate;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ChangePasswordRequest, MessageResponse, UserResponse};

/// `GET /users/me`: profile of the caller.
pub async fn get_me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserResponse>> {
    let profile = state.authority.profile(user.user_id()?).await?;
    Ok(Json(profile.into()))
}

/// `PUT /users/me`: update nickname and/or image.
pub async fn update_me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ProfileUpdate>,
) -> AppResult<Json<UserResponse>> {
    let profile = state
        .authority
        .update_profile(user.user_id()?, body)
        .await?;
    Ok(Json(profile.into()))
}

/// `PATCH /users/me/password`: change password after re-verifying the old one.
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if body.old_password.is_empty() || body.new_password.is_empty() {
        return Err(AppError::Validation(
            "oldPassword and newPassword are required".into(),
        ));
    }
    state
        .authority
        .change_password(user.user_id()?, &body.old_password, &body.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password changed".into(),
    }))
}
