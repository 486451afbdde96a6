//! Signed access tokens.

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::{Duration, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AuthError;

/// Purpose a token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TokenType {
    /// Bearer token for API calls.
    Access,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub email: String,
    /// Active tenant, if one is selected.
    pub tenant_id: Option<Uuid>,
    /// Caller's role in the active tenant.
    pub role: Option<String>,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Human oriented view of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TokenInfo {
    pub user_id: Uuid,
    pub email: String,
    pub tenant_id: Option<Uuid>,
    pub role: Option<String>,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    #[serde(with = "time::serde::rfc3339::option")]
    pub issued_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub is_expired: bool,
    /// Whole minutes left, absent once expired.
    pub expires_in_minutes: Option<i64>,
}

impl AccessClaims {
    /// Describe the claims relative to `now`.
    pub fn info(&self, now: OffsetDateTime) -> TokenInfo {
        let issued_at = OffsetDateTime::from_unix_timestamp(self.iat).ok();
        let expires_at = OffsetDateTime::from_unix_timestamp(self.exp).ok();
        let is_expired = expires_at.map_or(true, |exp| now > exp);
        let expires_in_minutes = match (is_expired, expires_at) {
            (false, Some(exp)) => Some((exp - now).whole_minutes()),
            _ => None,
        };

        TokenInfo {
            user_id: self.user_id,
            email: self.email.clone(),
            tenant_id: self.tenant_id,
            role: self.role.clone(),
            token_type: self.token_type,
            issued_at,
            expires_at,
            is_expired,
            expires_in_minutes,
        }
    }
}

/// Signing and verification keys for access tokens.
#[derive(Clone)]
pub struct JwtKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    /// Build keys from a shared secret.
    pub fn new(secret: &[u8], algorithm: Algorithm, ttl: Duration) -> Self {
        Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Build keys from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        let algorithm = match config.algorithm.to_uppercase().as_str() {
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            _ => Algorithm::HS256,
        };
        Self::new(config.secret_key.as_bytes(), algorithm, config.access_token_ttl())
    }

    /// Lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue an access token valid from `now`.
    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        tenant_id: Option<Uuid>,
        role: Option<String>,
        now: OffsetDateTime,
    ) -> Result<String, AuthError> {
        let claims = AccessClaims {
            user_id,
            email: email.to_string(),
            tenant_id,
            role,
            token_type: TokenType::Access,
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        decode::<AccessClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new(b"0123456789abcdef0123456789abcdef", Algorithm::HS256, Duration::minutes(30))
    }

    #[test]
    fn issued_token_verifies() {
        let keys = keys();
        let user = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let token = keys
            .issue(user, "a@example.com", Some(tenant), Some("admin".into()), now)
            .unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.user_id, user);
        assert_eq!(claims.tenant_id, Some(tenant));
        assert_eq!(claims.role.as_deref(), Some("admin"));
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let long_ago = OffsetDateTime::now_utc() - Duration::hours(2);
        let token = keys.issue(Uuid::new_v4(), "a@example.com", None, None, long_ago).unwrap();
        assert_eq!(keys.verify(&token).unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = JwtKeys::new(b"another-secret-another-secret-xx", Algorithm::HS256, Duration::minutes(30));
        let token = other
            .issue(Uuid::new_v4(), "a@example.com", None, None, OffsetDateTime::now_utc())
            .unwrap();
        assert!(matches!(keys().verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(keys().verify("not.a.jwt"), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn info_reports_remaining_minutes() {
        let now = OffsetDateTime::now_utc();
        let claims = AccessClaims {
            user_id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            tenant_id: None,
            role: None,
            token_type: TokenType::Access,
            iat: now.unix_timestamp(),
            exp: (now + Duration::minutes(30)).unix_timestamp(),
        };

        let info = claims.info(now + Duration::minutes(10));
        assert!(!info.is_expired);
        assert_eq!(info.expires_in_minutes, Some(20));

        let info = claims.info(now + Duration::minutes(31));
        assert!(info.is_expired);
        assert!(info.expires_in_minutes.is_none());
    }
}
