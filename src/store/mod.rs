/// Persistence for credentials and refresh tokens
///
/// Four reads and writes serve the token flows; signup and password change
/// add two credential writes. Uniqueness of handles and refresh tokens and
/// atomicity of revocation are the store's job, so every implementation must
/// reject duplicates and revoke with a single-row update.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Login material of one user
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: Uuid,
    pub handle: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A credential to create at signup. The hash is computed by the caller.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub user_id: Uuid,
    pub handle: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Replacement handle and password hash for an existing user
#[derive(Debug, Clone)]
pub struct CredentialUpdate {
    pub user_id: Uuid,
    pub handle: String,
    pub password_hash: String,
    pub updated_at: DateTime<Utc>,
}

/// A persisted refresh token. Only the digest of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// # Errors
    /// `StoreError::NotFound` if no user has this handle
    async fn find_credential_by_handle(&self, handle: &str) -> Result<Credential, StoreError>;

    /// # Errors
    /// `StoreError::UniqueViolation` if the handle is taken
    async fn insert_credential(&self, credential: &NewCredential)
        -> Result<Credential, StoreError>;

    /// # Errors
    /// - `StoreError::NotFound` if the user does not exist
    /// - `StoreError::UniqueViolation` if another user holds the new handle
    async fn update_credential(&self, update: &CredentialUpdate)
        -> Result<Credential, StoreError>;

    /// # Errors
    /// `StoreError::UniqueViolation` if the token already exists
    async fn insert_refresh_token(&self, token: &NewRefreshToken) -> Result<(), StoreError>;

    /// # Errors
    /// `StoreError::NotFound` if no row matches
    async fn find_refresh_token(&self, token_hash: &str)
        -> Result<RefreshTokenRecord, StoreError>;

    /// Set `revoked_at` unless it is already set. Revoking twice succeeds and
    /// keeps the first timestamp.
    ///
    /// # Errors
    /// `StoreError::NotFound` if no row matches
    async fn mark_refresh_token_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
