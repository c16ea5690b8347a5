use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kopontren_core::UserId;

use crate::Role;

/// JWT claims model.
///
/// `iat`/`exp` are unix seconds, as registered JWT claims are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id.
    pub sub: UserId,

    pub username: String,

    pub role: Role,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed or tampered token: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Deterministically validate JWT claims.
///
/// Validates the *claims* only; signature verification happens in the codec.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}
