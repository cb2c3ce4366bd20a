//! Storage seams for the token authority.
//!
//! The authority never talks to a database directly; it is handed a
//! [`UserStore`] and a [`TokenLedger`] at construction.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{
    NewRefreshToken, NewUser, ProfileUpdate, RefreshTokenRecord, User, UserRecord,
};

/// Storage failures, independent of the backing engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (duplicate email, duplicate hash).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

/// User accounts and their credentials.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, StoreError>;

    /// Create a user. Fails with `Conflict` when the email is taken.
    async fn create(&self, new_user: NewUser<'_>) -> Result<User, StoreError>;

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<(), StoreError>;

    /// Apply a partial profile update, returning `None` if the user is gone.
    async fn update_profile(
        &self,
        id: i64,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;
}

/// Durable, append-only record of issued refresh tokens.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn insert(&self, row: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError>;

    /// Find the non-revoked row owned by `user_id` with `token_hash`.
    ///
    /// Expiry is not filtered here; the caller decides what a stale row means.
    async fn find_active(
        &self,
        user_id: i64,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Atomically flip one row from active to revoked.
    ///
    /// Returns `true` only for the call that performed the flip; a row that
    /// was already revoked (or does not exist) yields `false`.
    async fn mark_revoked(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Revoke the active row with `token_hash`, if any. Returns rows flipped.
    async fn mark_revoked_by_hash(&self, token_hash: &str) -> Result<u64, StoreError>;

    /// Revoke every active row of `user_id`. Returns rows flipped.
    async fn mark_all_revoked(&self, user_id: i64) -> Result<u64, StoreError>;
}
