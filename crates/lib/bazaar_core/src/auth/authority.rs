//! Session/token authority: login, refresh rotation, logout and access token
//! verification.
//!
//! Access tokens are stateless and checked by signature and expiry only.
//! Refresh tokens are single-use: every successful `refresh` revokes the
//! presented token's ledger row before a new pair is issued.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::store::{TokenLedger, UserStore};
use super::{AuthError, AuthResult, hash_token, jwt, password};
use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::models::auth::{IssuedToken, NewRefreshToken, Session, TokenClaims, User};

/// What a logout call should revoke.
#[derive(Debug, Clone, Copy)]
pub enum Logout<'a> {
    /// Revoke the ledger row of one refresh token.
    Session { refresh_token: &'a str },
    /// Revoke every active refresh token of the authenticated caller.
    AllDevices,
}

/// Issues, rotates and revokes session tokens.
pub struct TokenAuthority {
    pub(super) users: Arc<dyn UserStore>,
    pub(super) ledger: Arc<dyn TokenLedger>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: AuthConfig,
}

impl TokenAuthority {
    /// Create an authority backed by the given stores and the system clock.
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        ledger: Arc<dyn TokenLedger>,
    ) -> Self {
        Self {
            users,
            ledger,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Sign a short-lived access token for `user`.
    pub fn issue_access_token(&self, user: &User) -> AuthResult<IssuedToken> {
        jwt::issue(
            user.id,
            &user.email,
            self.clock.now(),
            self.config.access_ttl,
            self.config.access_secret.as_bytes(),
        )
    }

    /// Sign a long-lived refresh token for `user` with the refresh key.
    ///
    /// The caller is responsible for persisting its hash.
    pub fn issue_refresh_token(&self, user: &User) -> AuthResult<IssuedToken> {
        jwt::issue(
            user.id,
            &user.email,
            self.clock.now(),
            self.config.refresh_ttl,
            self.config.refresh_secret.as_bytes(),
        )
    }

    /// Verify an access token's signature and expiry. No ledger lookup.
    pub fn verify_access_token(&self, token: &str) -> AuthResult<TokenClaims> {
        jwt::verify(
            token,
            self.config.access_secret.as_bytes(),
            self.clock.now(),
        )
    }

    /// Authenticate with email + password and open a new session.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<Session> {
        let Some(record) = self.users.find_by_email(email.trim()).await? else {
            password::verify_dummy(password);
            debug!("login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify_password(password, &record.password_hash)? {
            debug!(user_id = record.user.id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.start_session(record.user).await?;
        info!(user_id = session.user.id, "login succeeded");
        Ok(session)
    }

    /// Exchange a refresh token for a new token pair, revoking the old one.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<Session> {
        let claims = jwt::decode_signed(refresh_token, self.config.refresh_secret.as_bytes())?;
        let user_id = claims.user_id().ok_or(AuthError::InvalidToken)?;

        let token_hash = hash_token(refresh_token);
        let Some(row) = self.ledger.find_active(user_id, &token_hash).await? else {
            debug!(user_id, "refresh rejected: no active ledger row");
            return Err(AuthError::InvalidToken);
        };

        if self.clock.now() > row.expires_at {
            debug!(user_id, row_id = %row.id, "refresh rejected: token expired");
            return Err(AuthError::TokenExpired);
        }

        if !self.ledger.mark_revoked(row.id).await? {
            warn!(user_id, row_id = %row.id, "refresh token reused concurrently");
            return Err(AuthError::InvalidToken);
        }

        let Some(record) = self.users.find_by_id(user_id).await? else {
            debug!(user_id, "refresh rejected: user no longer exists");
            return Err(AuthError::InvalidToken);
        };

        let session = self.start_session(record.user).await?;
        debug!(user_id, rotated = %row.id, "refresh token rotated");
        Ok(session)
    }

    /// Revoke one session, or all sessions of the authenticated caller.
    ///
    /// Returns the number of ledger rows flipped. Revoking an unknown or
    /// already-revoked token is not an error.
    pub async fn logout(
        &self,
        request: Logout<'_>,
        caller: Option<&TokenClaims>,
    ) -> AuthResult<u64> {
        match request {
            Logout::Session { refresh_token } => {
                let revoked = self
                    .ledger
                    .mark_revoked_by_hash(&hash_token(refresh_token))
                    .await?;
                debug!(revoked, "session logout");
                Ok(revoked)
            }
            Logout::AllDevices => {
                let claims = caller.ok_or(AuthError::Unauthenticated)?;
                let user_id = claims.user_id().ok_or(AuthError::InvalidToken)?;
                let revoked = self.ledger.mark_all_revoked(user_id).await?;
                info!(user_id, revoked, "logged out of all devices");
                Ok(revoked)
            }
        }
    }

    /// Issue an access/refresh pair for `user` and record the refresh token.
    async fn start_session(&self, user: User) -> AuthResult<Session> {
        let access_token = self.issue_access_token(&user)?;
        let refresh_token = self.issue_refresh_token(&user)?;
        self.ledger
            .insert(NewRefreshToken {
                user_id: user.id,
                token_hash: hash_token(&refresh_token.token),
                expires_at: refresh_token.expires_at,
            })
            .await?;
        Ok(Session {
            access_token,
            refresh_token,
            user,
        })
    }
}
