//! Authentication and session management.
//!
//! Provides password hashing, JWT issuance/verification, refresh token
//! rotation and the storage seams (`UserStore`, `TokenLedger`) the
//! [`TokenAuthority`] is built on.

pub mod account;
pub mod authority;
pub mod digest;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod store;

use thiserror::Error;

pub use account::ensure_owner;
pub use authority::{Logout, TokenAuthority};
pub use digest::hash_token;
pub use store::{StoreError, TokenLedger, UserStore};

/// Authentication errors.
///
/// Every variant except `Internal` is a caller-recoverable outcome. `Internal`
/// covers storage and crypto failures and must never leak details to clients.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(what) => AuthError::AlreadyExists(what),
            StoreError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}

/// Convenience alias for authority results.
pub type AuthResult<T> = Result<T, AuthError>;
