//! Authority configuration: signing secrets and token lifetimes.

pub mod lifetime;
pub mod secrets;

use chrono::Duration;
use thiserror::Error;

pub use lifetime::parse_lifetime;
pub use secrets::resolve_secret;

/// Default access token lifetime.
pub const DEFAULT_ACCESS_TOKEN_EXPIRES: &str = "1h";

/// Default refresh token lifetime.
pub const DEFAULT_REFRESH_TOKEN_EXPIRES: &str = "7d";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid lifetime '{value}' for {key}")]
    InvalidLifetime { key: String, value: String },

    #[error("Invalid boolean '{value}' for {key}")]
    InvalidBool { key: String, value: String },

    #[error("Access and refresh tokens must use different signing secrets")]
    SharedSecret,

    #[error("Signing secret for {0} is empty")]
    EmptySecret(&'static str),
}

/// Settings consumed by [`crate::auth::TokenAuthority`].
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 secret for access tokens.
    pub access_secret: String,
    /// HS256 secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Revoke every refresh token of a user after a password change.
    pub revoke_sessions_on_password_change: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field(
                "revoke_sessions_on_password_change",
                &self.revoke_sessions_on_password_change,
            )
            .finish()
    }
}

impl AuthConfig {
    /// Build a config with default lifetimes and the given secrets.
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(7),
            revoke_sessions_on_password_change: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                              | Default                        |
    /// |---------------------------------------|--------------------------------|
    /// | `JWT_SECRET`                          | generated & persisted to file  |
    /// | `REFRESH_TOKEN_SECRET`                | generated & persisted to file  |
    /// | `ACCESS_TOKEN_EXPIRES`                | `1h`                           |
    /// | `REFRESH_TOKEN_EXPIRES`               | `7d`                           |
    /// | `REVOKE_SESSIONS_ON_PASSWORD_CHANGE`  | `true`                         |
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            access_secret: resolve_secret("JWT_SECRET", "jwt-secret"),
            refresh_secret: resolve_secret("REFRESH_TOKEN_SECRET", "refresh-token-secret"),
            access_ttl: lifetime_from_env("ACCESS_TOKEN_EXPIRES", DEFAULT_ACCESS_TOKEN_EXPIRES)?,
            refresh_ttl: lifetime_from_env(
                "REFRESH_TOKEN_EXPIRES",
                DEFAULT_REFRESH_TOKEN_EXPIRES,
            )?,
            revoke_sessions_on_password_change: bool_from_env(
                "REVOKE_SESSIONS_ON_PASSWORD_CHANGE",
                true,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the access token lifetime.
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Override the refresh token lifetime.
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Toggle session revocation on password change.
    pub fn with_revoke_on_password_change(mut self, revoke: bool) -> Self {
        self.revoke_sessions_on_password_change = revoke;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::EmptySecret("access tokens"));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::EmptySecret("refresh tokens"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::SharedSecret);
        }
        Ok(())
    }
}

fn lifetime_from_env(key: &str, default: &str) -> Result<Duration, ConfigError> {
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    parse_lifetime(&value).ok_or_else(|| ConfigError::InvalidLifetime {
        key: key.to_string(),
        value,
    })
}

fn bool_from_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool {
                key: key.to_string(),
                value,
            }),
        },
    }
}
