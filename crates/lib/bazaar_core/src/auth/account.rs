//! Account operations around the authority: registration, profile and
//! password change.

use tracing::{debug, info};

use super::authority::TokenAuthority;
use super::{AuthError, AuthResult, password};
use crate::models::auth::{NewUser, ProfileUpdate, TokenClaims, User};

impl TokenAuthority {
    /// Register a new user account. Does not open a session.
    pub async fn register(
        &self,
        email: &str,
        nickname: &str,
        password: &str,
        image: Option<&str>,
    ) -> AuthResult<User> {
        let email = email.trim();
        let nickname = nickname.trim();
        if email.is_empty() || nickname.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "email, nickname and password are required".into(),
            ));
        }
        if !email.contains('@') {
            return Err(AuthError::Validation("email is not valid".into()));
        }
        password::validate_new_password(password)?;

        let password_hash = password::hash_password(password)?;
        let user = self
            .users
            .create(NewUser {
                email,
                nickname,
                password_hash: &password_hash,
                image,
            })
            .await
            .map_err(|e| match AuthError::from(e) {
                AuthError::AlreadyExists(_) => AuthError::AlreadyExists("email".into()),
                other => other,
            })?;

        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Public profile of `user_id`.
    pub async fn profile(&self, user_id: i64) -> AuthResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|record| record.user)
            .ok_or_else(|| AuthError::NotFound("user".into()))
    }

    /// Apply a partial profile update. Blank nicknames are ignored.
    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> AuthResult<User> {
        let update = ProfileUpdate {
            nickname: update
                .nickname
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            image: update.image,
        };
        self.users
            .update_profile(user_id, &update)
            .await?
            .ok_or_else(|| AuthError::NotFound("user".into()))
    }

    /// Re-verify `old_password` and replace the stored hash.
    ///
    /// When configured, every outstanding refresh token of the user is
    /// revoked afterwards.
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        password::validate_new_password(new_password)?;

        let Some(record) = self.users.find_by_id(user_id).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !password::verify_password(old_password, &record.password_hash)? {
            debug!(user_id, "password change rejected: wrong old password");
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = password::hash_password(new_password)?;
        self.users.update_password_hash(user_id, &new_hash).await?;

        if self.config.revoke_sessions_on_password_change {
            let revoked = self.ledger.mark_all_revoked(user_id).await?;
            info!(user_id, revoked, "password changed, sessions revoked");
        } else {
            info!(user_id, "password changed");
        }
        Ok(())
    }
}

/// Fail with `Forbidden` unless `claims` belong to `owner_id`.
pub fn ensure_owner(claims: &TokenClaims, owner_id: i64) -> AuthResult<()> {
    match claims.user_id() {
        Some(id) if id == owner_id => Ok(()),
        Some(_) => Err(AuthError::Forbidden),
        None => Err(AuthError::InvalidToken),
    }
}
