//! JWT token generation and verification.
//!
//! Expiry is deliberately not enforced by `jsonwebtoken` here: callers check
//! `exp` against their injected clock so that an expired token can be told
//! apart from a forged one.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::AuthError;
use crate::models::auth::{IssuedToken, TokenClaims};
use crate::uuid::uuidv4;

/// Build claims for `user_id`/`email` valid from `now` for `ttl`.
///
/// Fails with `Internal` when `now + ttl` is not a representable instant.
pub fn build_claims(
    user_id: i64,
    email: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<TokenClaims, AuthError> {
    let exp = now
        .checked_add_signed(ttl)
        .ok_or_else(|| AuthError::Internal(format!("token lifetime out of range: {ttl}")))?;
    Ok(TokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        jti: uuidv4().to_string(),
    })
}

/// Sign claims with HS256.
pub fn sign(claims: &TokenClaims, secret: &[u8]) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

/// Build, sign and return a token together with its expiry.
pub fn issue(
    user_id: i64,
    email: &str,
    now: DateTime<Utc>,
    ttl: Duration,
    secret: &[u8],
) -> Result<IssuedToken, AuthError> {
    let claims = build_claims(user_id, email, now, ttl)?;
    let token = sign(&claims, secret)?;
    let expires_at = expiry_of(&claims)?;
    Ok(IssuedToken { token, expires_at })
}

/// Verify the signature and shape of a token, returning its claims.
///
/// Does not check `exp`. Any failure is reported as `InvalidToken`.
pub fn decode_signed(token: &str, secret: &[u8]) -> Result<TokenClaims, AuthError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "jwt rejected");
            AuthError::InvalidToken
        })
}

/// Verify signature and then expiry against `now` (valid while `now <= exp`).
pub fn verify(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
    let claims = decode_signed(token, secret)?;
    if now.timestamp() > claims.exp {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

/// The `exp` claim as a timestamp.
pub fn expiry_of(claims: &TokenClaims) -> Result<DateTime<Utc>, AuthError> {
    DateTime::<Utc>::from_timestamp(claims.exp, 0)
        .ok_or_else(|| AuthError::Internal(format!("exp out of range: {}", claims.exp)))
}
