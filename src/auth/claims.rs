/// Access token claims
///
/// Payload of an access token: who it is about, when it was minted and when
/// it stops being accepted (RFC 7519 registered claims).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    /// Claims for `user_id`, valid from `issued_at` for `ttl`.
    ///
    /// A negative `ttl` yields claims that are already expired.
    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>, ttl: Duration, issuer: &str) -> Self {
        Self {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            iss: issuer.to_string(),
        }
    }

    /// # Errors
    /// `AuthError::TokenInvalid` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenInvalid)
    }

    /// Expired once `now` reaches `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
