//! PostgreSQL implementations of the auth storage traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{StoreError, TokenLedger, UserStore};
use crate::models::auth::{
    NewRefreshToken, NewUser, ProfileUpdate, RefreshTokenRecord, User, UserRecord,
};
use crate::uuid::uuidv7;

type UserRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

type ProfileRow = (
    i64,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

type LedgerRow = (Uuid, i64, String, DateTime<Utc>, bool, DateTime<Utc>);

fn user_from_row(
    (id, email, nickname, image, created_at, updated_at): ProfileRow,
) -> User {
    User {
        id,
        email,
        nickname,
        image,
        created_at,
        updated_at,
    }
}

fn record_from_row(
    (id, email, nickname, password_hash, image, created_at, updated_at): UserRow,
) -> UserRecord {
    UserRecord {
        user: user_from_row((id, email, nickname, image, created_at, updated_at)),
        password_hash,
    }
}

fn ledger_from_row(
    (id, user_id, token_hash, expires_at, revoked, created_at): LedgerRow,
) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id,
        user_id,
        token_hash,
        expires_at,
        revoked,
        created_at,
    }
}

/// `users` table access.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, nickname, password_hash, image, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(record_from_row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, nickname, password_hash, image, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(record_from_row))
    }

    async fn create(&self, new_user: NewUser<'_>) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "INSERT INTO users (email, nickname, password_hash, image) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, email, nickname, image, created_at, updated_at",
        )
        .bind(new_user.email)
        .bind(new_user.nickname)
        .bind(new_user.password_hash)
        .bind(new_user.image)
        .fetch_one(&self.pool)
        .await?;
        Ok(user_from_row(row))
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: i64,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "UPDATE users SET \
               nickname = COALESCE($2, nickname), \
               image = CASE WHEN $3 THEN $4 ELSE image END, \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING id, email, nickname, image, created_at, updated_at",
        )
        .bind(id)
        .bind(update.nickname.as_deref())
        .bind(update.image.is_some())
        .bind(update.image.clone().flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_row))
    }
}

/// `refresh_tokens` table access.
#[derive(Debug, Clone)]
pub struct PgTokenLedger {
    pool: PgPool,
}

impl PgTokenLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenLedger for PgTokenLedger {
    async fn insert(&self, row: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError> {
        let inserted = sqlx::query_as::<_, LedgerRow>(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, token_hash, expires_at, revoked, created_at",
        )
        .bind(uuidv7())
        .bind(row.user_id)
        .bind(&row.token_hash)
        .bind(row.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(ledger_from_row(inserted))
    }

    async fn find_active(
        &self,
        user_id: i64,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, user_id, token_hash, expires_at, revoked, created_at \
             FROM refresh_tokens \
             WHERE user_id = $1 AND token_hash = $2 AND revoked = false",
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ledger_from_row))
    }

    async fn mark_revoked(&self, id: Uuid) -> Result<bool, StoreError> {
        // The `revoked = false` predicate is re-checked after the row lock is
        // taken, so of two concurrent callers only one sees a row affected.
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE id = $1 AND revoked = false")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_revoked_by_hash(&self, token_hash: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = true \
             WHERE token_hash = $1 AND revoked = false",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn mark_all_revoked(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = true \
             WHERE user_id = $1 AND revoked = false",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
