//! HS256 token issuing and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{JwtClaims, Role, TokenError, validate_claims};
use kopontren_core::UserId;

/// Verifies bearer tokens. The API middleware only depends on this trait.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Shared-secret HS256 codec used for both issuing (login) and validating.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        user_id: UserId,
        username: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<(String, JwtClaims), TokenError> {
        let claims = JwtClaims {
            sub: user_id,
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, claims))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        // Time checks run against the caller's clock in `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_with_same_secret() {
        let codec = Hs256Jwt::new(b"secret", Duration::minutes(30));
        let now = Utc::now();
        let user = UserId::new();
        let (token, _) = codec.issue(user, "admin", Role::Admin, now).unwrap();

        let claims = codec.validate(&token, now + Duration::minutes(1)).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let now = Utc::now();
        let (token, _) = Hs256Jwt::new(b"one", Duration::minutes(5))
            .issue(UserId::new(), "admin", Role::Admin, now)
            .unwrap();
        let err = Hs256Jwt::new(b"two", Duration::minutes(5))
            .validate(&token, now)
            .unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn token_expires_after_ttl() {
        let codec = Hs256Jwt::new(b"secret", Duration::minutes(5));
        let now = Utc::now();
        let (token, _) = codec.issue(UserId::new(), "kasir", Role::Cashier, now).unwrap();
        assert_eq!(
            codec.validate(&token, now + Duration::minutes(6)),
            Err(TokenError::Expired)
        );
    }
}
