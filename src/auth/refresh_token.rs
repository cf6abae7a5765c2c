/// Refresh Token Management
///
/// Refresh tokens are:
/// - Cryptographically secure random 64-character base62 strings (~380 bits)
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Long-lived and reusable: minting an access token does not consume them
/// - Individually revocable; revoked rows are kept for audit

use chrono::Duration;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AppError, AuthError, StoreError};
use crate::store::{CredentialStore, NewRefreshToken, RefreshTokenRecord};

pub const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 60 * 24 * 60 * 60;
/// 100 years
pub const MAX_REFRESH_TOKEN_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;
const REFRESH_TOKEN_LENGTH: usize = 64;

/// Generate a new cryptographically secure refresh token
///
/// The plaintext is what the client keeps; the server only stores its hash.
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn not_found_as_token_error(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::Auth(AuthError::TokenNotFound),
        other => AppError::Store(other),
    }
}

/// Issues, looks up and revokes refresh tokens against a `CredentialStore`.
#[derive(Clone)]
pub struct RefreshTokenStore {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl RefreshTokenStore {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Persist a fresh token for `user_id` and return its plaintext.
    ///
    /// # Errors
    /// - `AppError::Internal` if the expiry falls outside the representable range
    /// - store errors if the insert fails
    pub async fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = generate_refresh_token();
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AppError::Internal("Refresh token expiry out of range".to_string())
        })?;

        self.store
            .insert_refresh_token(&NewRefreshToken {
                token_hash: hash_token(&token),
                user_id,
                created_at: now,
                expires_at,
            })
            .await?;

        tracing::debug!(user_id = %user_id, "Refresh token issued");
        Ok(token)
    }

    /// Fetch the row for `token` without judging whether it is still usable.
    ///
    /// # Errors
    /// `AuthError::TokenNotFound` if no row matches
    pub async fn lookup(&self, token: &str) -> Result<RefreshTokenRecord, AppError> {
        self.store
            .find_refresh_token(&hash_token(token))
            .await
            .map_err(not_found_as_token_error)
    }

    /// Owner of `token`, if the token is neither revoked nor expired.
    ///
    /// # Errors
    /// `TokenNotFound`, `TokenRevoked` or `TokenExpired`
    pub async fn resolve_identity(&self, token: &str) -> Result<Uuid, AppError> {
        let record = self.lookup(token).await?;

        if record.is_revoked() {
            tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
            return Err(AuthError::TokenRevoked.into());
        }

        if record.is_expired_at(self.clock.now()) {
            tracing::info!(user_id = %record.user_id, "Refresh token expired");
            return Err(AuthError::TokenExpired.into());
        }

        Ok(record.user_id)
    }

    /// Mark `token` revoked. Revoking an already revoked token succeeds.
    ///
    /// # Errors
    /// `AuthError::TokenNotFound` if no row matches
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.store
            .mark_refresh_token_revoked(&hash_token(token), self.clock.now())
            .await
            .map_err(not_found_as_token_error)
    }
}
