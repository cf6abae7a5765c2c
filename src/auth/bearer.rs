/// Bearer token extraction from the `Authorization` header.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme is matched case-sensitively with exactly one space after it;
/// whitespace around the token itself is trimmed.
///
/// # Errors
/// - `AuthError::HeaderMissing` if there is no `Authorization` header
/// - `AuthError::MalformedHeader` for any other scheme, a missing separator,
///   a non-text value or an empty token
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::HeaderMissing)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token.to_string())
}
