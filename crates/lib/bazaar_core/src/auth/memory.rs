//! In-memory implementations of the auth storage traits.
//!
//! Used by tests and by the server's `--in-memory` mode. Per-row atomicity
//! comes from DashMap's shard locks.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::store::{StoreError, TokenLedger, UserStore};
use crate::models::auth::{
    NewRefreshToken, NewUser, ProfileUpdate, RefreshTokenRecord, User, UserRecord,
};
use crate::uuid::uuidv7;

/// In-memory user store with database-style sequential ids starting at 1.
#[derive(Debug)]
pub struct MemoryUserStore {
    users: DashMap<i64, UserRecord>,
    emails: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn create(&self, new_user: NewUser<'_>) -> Result<User, StoreError> {
        match self.emails.entry(new_user.email.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict("users_email_key".into())),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let now = Utc::now();
                let user = User {
                    id,
                    email: new_user.email.to_string(),
                    nickname: new_user.nickname.to_string(),
                    image: new_user.image.map(str::to_string),
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(
                    id,
                    UserRecord {
                        user: user.clone(),
                        password_hash: new_user.password_hash.to_string(),
                    },
                );
                slot.insert(id);
                Ok(user)
            }
        }
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        if let Some(mut record) = self.users.get_mut(&id) {
            record.password_hash = password_hash.to_string();
            record.user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: i64,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let Some(mut record) = self.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(nickname) = &update.nickname {
            record.user.nickname = nickname.clone();
        }
        if let Some(image) = &update.image {
            record.user.image = image.clone();
        }
        record.user.updated_at = Utc::now();
        Ok(Some(record.user.clone()))
    }
}

/// In-memory refresh token ledger.
#[derive(Debug, Default)]
pub struct MemoryTokenLedger {
    rows: DashMap<Uuid, RefreshTokenRecord>,
    by_hash: DashMap<String, Uuid>,
}

impl MemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows owned by `user_id`, oldest first.
    pub fn rows_for(&self, user_id: i64) -> Vec<RefreshTokenRecord> {
        let mut rows: Vec<_> = self
            .rows
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone())
            .collect();
        rows.sort_by_key(|r| r.id);
        rows
    }

    /// Total number of rows, revoked or not.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl TokenLedger for MemoryTokenLedger {
    async fn insert(&self, row: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError> {
        match self.by_hash.entry(row.token_hash.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict("refresh_tokens_token_hash_key".into())),
            Entry::Vacant(slot) => {
                let record = RefreshTokenRecord {
                    id: uuidv7(),
                    user_id: row.user_id,
                    token_hash: row.token_hash,
                    expires_at: row.expires_at,
                    revoked: false,
                    created_at: Utc::now(),
                };
                self.rows.insert(record.id, record.clone());
                slot.insert(record.id);
                Ok(record)
            }
        }
    }

    async fn find_active(
        &self,
        user_id: i64,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let Some(id) = self.by_hash.get(token_hash).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self
            .rows
            .get(&id)
            .filter(|r| r.user_id == user_id && !r.revoked)
            .map(|r| r.clone()))
    }

    async fn mark_revoked(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(false);
        };
        if row.revoked {
            return Ok(false);
        }
        row.revoked = true;
        Ok(true)
    }

    async fn mark_revoked_by_hash(&self, token_hash: &str) -> Result<u64, StoreError> {
        let Some(id) = self.by_hash.get(token_hash).map(|id| *id) else {
            return Ok(0);
        };
        Ok(u64::from(self.mark_revoked(id).await?))
    }

    async fn mark_all_revoked(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut flipped = 0;
        for mut row in self.rows.iter_mut() {
            if row.user_id == user_id && !row.revoked {
                row.revoked = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn new_user<'a>(email: &'a str) -> NewUser<'a> {
        NewUser {
            email,
            nickname: "nick",
            password_hash: "hash",
            image: None,
        }
    }

    fn new_row(user_id: i64, hash: &str) -> NewRefreshToken {
        NewRefreshToken {
            user_id,
            token_hash: hash.to_string(),
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn users_get_sequential_ids() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@x.com")).await.unwrap();
        let b = store.create(new_user("b@x.com")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com")).await.unwrap();
        let err = store.create(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_by_email_and_id_agree() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@x.com")).await.unwrap();
        let by_email = store.find_by_email("a@x.com").await.unwrap().unwrap();
        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_email.user, by_id.user);
        assert_eq!(by_email.password_hash, "hash");
        assert!(store.find_by_email("nobody@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_update_applies_partial_fields() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@x.com")).await.unwrap();

        let update = ProfileUpdate {
            nickname: None,
            image: Some(Some("me.png".into())),
        };
        let updated = store.update_profile(user.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.nickname, "nick");
        assert_eq!(updated.image.as_deref(), Some("me.png"));

        let clear = ProfileUpdate {
            nickname: Some("new".into()),
            image: Some(None),
        };
        let updated = store.update_profile(user.id, &clear).await.unwrap().unwrap();
        assert_eq!(updated.nickname, "new");
        assert!(updated.image.is_none());

        assert!(store.update_profile(99, &clear).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_revoked_flips_once() {
        let ledger = MemoryTokenLedger::new();
        let row = ledger.insert(new_row(1, "h1")).await.unwrap();
        assert!(ledger.mark_revoked(row.id).await.unwrap());
        assert!(!ledger.mark_revoked(row.id).await.unwrap());
        assert!(!ledger.mark_revoked(Uuid::nil()).await.unwrap());
    }

    #[tokio::test]
    async fn find_active_requires_owner_and_not_revoked() {
        let ledger = MemoryTokenLedger::new();
        let row = ledger.insert(new_row(1, "h1")).await.unwrap();
        assert!(ledger.find_active(2, "h1").await.unwrap().is_none());
        assert_eq!(ledger.find_active(1, "h1").await.unwrap(), Some(row.clone()));
        ledger.mark_revoked(row.id).await.unwrap();
        assert!(ledger.find_active(1, "h1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_hash_conflicts() {
        let ledger = MemoryTokenLedger::new();
        ledger.insert(new_row(1, "h1")).await.unwrap();
        let err = ledger.insert(new_row(1, "h1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn mark_all_revoked_only_touches_owner() {
        let ledger = MemoryTokenLedger::new();
        ledger.insert(new_row(1, "a")).await.unwrap();
        ledger.insert(new_row(1, "b")).await.unwrap();
        ledger.insert(new_row(2, "c")).await.unwrap();

        assert_eq!(ledger.mark_all_revoked(1).await.unwrap(), 2);
        assert_eq!(ledger.mark_all_revoked(1).await.unwrap(), 0);
        assert!(ledger.find_active(2, "c").await.unwrap().is_some());
        assert_eq!(ledger.len(), 3);
    }

    #[tokio::test]
    async fn revoke_by_hash_is_idempotent() {
        let ledger = MemoryTokenLedger::new();
        ledger.insert(new_row(1, "a")).await.unwrap();
        assert_eq!(ledger.mark_revoked_by_hash("a").await.unwrap(), 1);
        assert_eq!(ledger.mark_revoked_by_hash("a").await.unwrap(), 0);
        assert_eq!(ledger.mark_revoked_by_hash("missing").await.unwrap(), 0);
    }
}
