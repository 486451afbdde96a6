//! Stored opaque tokens: refresh tokens and password reset tokens.

use time::OffsetDateTime;
use uuid::Uuid;

/// A refresh token issued alongside an access token.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub revoked: bool,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    /// Token that replaced this one on rotation.
    pub replaced_by_token: Option<String>,
}

impl RefreshToken {
    /// Whether the token can still be exchanged at `now`.
    pub fn is_usable(&self, now: OffsetDateTime) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Values for a refresh token about to be stored.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// A single-use password reset token.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub used: bool,
    pub created_at: OffsetDateTime,
}

impl PasswordResetToken {
    /// Whether the token can still be redeemed at `now`.
    pub fn is_usable(&self, now: OffsetDateTime) -> bool {
        !self.used && self.expires_at > now
    }
}

/// Values for a reset token about to be stored.
#[derive(Debug, Clone)]
pub struct NewPasswordResetToken {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn refresh_token_usability() {
        let now = OffsetDateTime::now_utc();
        let mut token = RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "t".to_string(),
            revoked: false,
            expires_at: now + Duration::days(1),
            created_at: now,
            replaced_by_token: None,
        };
        assert!(token.is_usable(now));

        token.revoked = true;
        assert!(!token.is_usable(now));

        token.revoked = false;
        assert!(!token.is_usable(now + Duration::days(2)));
    }

    #[test]
    fn reset_token_is_single_use() {
        let now = OffsetDateTime::now_utc();
        let mut token = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "t".to_string(),
            expires_at: now + Duration::minutes(60),
            used: false,
            created_at: now,
        };
        assert!(token.is_usable(now));
        token.used = true;
        assert!(!token.is_usable(now));
    }
}
