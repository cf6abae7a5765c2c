/// Access token issuing and validation
///
/// Access tokens are HS256 JWTs signed with the server secret. Validation is
/// a pure function of the token, the secret and the current time; nothing
/// is looked up in storage and there is no revocation list.
///
/// Lifetime policy: access tokens never live longer than
/// `MAX_ACCESS_TOKEN_TTL_SECONDS`. The cap is applied by callers at the
/// configuration and request boundaries; the codec signs whatever `ttl` it
/// is given.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::error::{AppError, AuthError};

pub const TOKEN_ISSUER: &str = "chirpy";
pub const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

/// Issue an access token for `user_id`, valid for `ttl` from now.
///
/// # Errors
/// Returns error if token encoding fails
pub fn issue_access_token(user_id: &Uuid, secret: &str, ttl: Duration) -> Result<String, AppError> {
    issue_access_token_at(user_id, secret, ttl, Utc::now())
}

/// Issue an access token as if the current time were `now`.
pub fn issue_access_token_at(
    user_id: &Uuid,
    secret: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = Claims::new(*user_id, now, ttl, TOKEN_ISSUER);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return its subject.
///
/// # Errors
/// - `AuthError::TokenInvalid` for a bad signature, malformed token or
///   unparseable subject
/// - `AuthError::TokenExpired` once the current time reaches `exp`
pub fn validate_access_token(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    validate_access_token_at(token, secret, Utc::now())
}

/// Validate an access token against an explicit `now`.
pub fn validate_access_token_at(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);
    // Expiry is checked below against `now`, with no leeway.
    validation.validate_exp = false;
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        AuthError::TokenInvalid
    })?;

    if claims.is_expired_at(now) {
        return Err(AuthError::TokenExpired);
    }

    claims.user_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "correctSecretToken";
    const OTHER_SECRET: &str = "anotherSecretToken";

    #[test]
    fn test_issue_and_validate_token() {
        let user_id = Uuid::new_v4();

        let token = issue_access_token(&user_id, SECRET, Duration::hours(1))
            .expect("Failed to issue token");

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(validate_access_token(&token, SECRET), Ok(user_id));
    }

    #[test]
    fn test_wrong_secret() {
        let token = issue_access_token(&Uuid::new_v4(), SECRET, Duration::hours(1))
            .expect("Failed to issue token");

        assert_eq!(
            validate_access_token(&token, OTHER_SECRET),
            Err(AuthError::TokenInvalid)
        );
        assert_eq!(validate_access_token(&token, ""), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_expired_token() {
        let token = issue_access_token(&Uuid::new_v4(), SECRET, Duration::seconds(-1))
            .expect("Failed to issue token");

        assert_eq!(validate_access_token(&token, SECRET), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_expired_token_with_wrong_secret_is_invalid() {
        let token = issue_access_token(&Uuid::new_v4(), SECRET, Duration::hours(-1))
            .expect("Failed to issue token");

        assert_eq!(
            validate_access_token(&token, OTHER_SECRET),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_token_expires_after_ttl() {
        let user_id = Uuid::new_v4();
        let issued_at = Utc::now();
        let token = issue_access_token_at(&user_id, SECRET, Duration::hours(1), issued_at)
            .expect("Failed to issue token");

        let before = issued_at + Duration::minutes(59);
        let after = issued_at + Duration::minutes(61);

        assert_eq!(validate_access_token_at(&token, SECRET, before), Ok(user_id));
        assert_eq!(
            validate_access_token_at(&token, SECRET, after),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_invalid_token() {
        assert_eq!(
            validate_access_token("invalid.token.here", SECRET),
            Err(AuthError::TokenInvalid)
        );
        assert_eq!(validate_access_token("", SECRET), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_tampered_token() {
        let token = issue_access_token(&Uuid::new_v4(), SECRET, Duration::hours(1))
            .expect("Failed to issue token");

        let tampered = format!("{}X", token);
        assert_eq!(validate_access_token(&tampered, SECRET), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_non_uuid_subject() {
        let now = Utc::now();
        let mut claims = Claims::new(Uuid::new_v4(), now, Duration::hours(1), TOKEN_ISSUER);
        claims.sub = "not-a-user".to_string();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(validate_access_token(&token, SECRET), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_wrong_issuer() {
        let now = Utc::now();
        let claims = Claims::new(Uuid::new_v4(), now, Duration::hours(1), "someone-else");
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(validate_access_token(&token, SECRET), Err(AuthError::TokenInvalid));
    }
}
