use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::{
    Credential, CredentialStore, CredentialUpdate, NewCredential, NewRefreshToken,
    RefreshTokenRecord,
};
use crate::error::StoreError;

/// Process-local store, used by tests and local runs without Postgres.
///
/// Each operation holds the relevant lock for its whole read-check-write, so
/// inserts stay unique and revocation is atomic like a single-row UPDATE.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    credentials: RwLock<HashMap<String, Credential>>,
    refresh_tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return their new ID.
    ///
    /// # Errors
    /// `StoreError::UniqueViolation` if the handle is taken
    pub fn add_credential(&self, handle: &str, password_hash: &str) -> Result<Uuid, StoreError> {
        let mut credentials = self.credentials.write().map_err(|_| poisoned())?;
        if credentials.contains_key(handle) {
            return Err(StoreError::UniqueViolation(format!("handle {}", handle)));
        }

        let user_id = Uuid::new_v4();
        let now = Utc::now();
        credentials.insert(
            handle.to_string(),
            Credential {
                user_id,
                handle: handle.to_string(),
                password_hash: password_hash.to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(user_id)
    }

    /// Number of refresh token rows ever stored for `user_id`.
    pub fn refresh_token_count(&self, user_id: Uuid) -> usize {
        self.refresh_tokens
            .read()
            .map(|tokens| tokens.values().filter(|t| t.user_id == user_id).count())
            .unwrap_or(0)
    }
}

fn poisoned() -> StoreError {
    StoreError::Query("store lock poisoned".to_string())
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_credential_by_handle(&self, handle: &str) -> Result<Credential, StoreError> {
        self.credentials
            .read()
            .map_err(|_| poisoned())?
            .get(handle)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_credential(
        &self,
        credential: &NewCredential,
    ) -> Result<Credential, StoreError> {
        let mut credentials = self.credentials.write().map_err(|_| poisoned())?;
        if credentials.contains_key(&credential.handle) {
            return Err(StoreError::UniqueViolation(format!("handle {}", credential.handle)));
        }

        let stored = Credential {
            user_id: credential.user_id,
            handle: credential.handle.clone(),
            password_hash: credential.password_hash.clone(),
            created_at: credential.created_at,
            updated_at: credential.created_at,
        };
        credentials.insert(stored.handle.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_credential(&self, update: &CredentialUpdate) -> Result<Credential, StoreError> {
        let mut credentials = self.credentials.write().map_err(|_| poisoned())?;

        let current_handle = credentials
            .values()
            .find(|c| c.user_id == update.user_id)
            .map(|c| c.handle.clone())
            .ok_or(StoreError::NotFound)?;

        if current_handle != update.handle && credentials.contains_key(&update.handle) {
            return Err(StoreError::UniqueViolation(format!("handle {}", update.handle)));
        }

        let mut stored = credentials
            .remove(&current_handle)
            .ok_or(StoreError::NotFound)?;
        stored.handle = update.handle.clone();
        stored.password_hash = update.password_hash.clone();
        stored.updated_at = update.updated_at;

        credentials.insert(stored.handle.clone(), stored.clone());
        Ok(stored)
    }

    async fn insert_refresh_token(&self, token: &NewRefreshToken) -> Result<(), StoreError> {
        let mut tokens = self.refresh_tokens.write().map_err(|_| poisoned())?;
        if tokens.contains_key(&token.token_hash) {
            return Err(StoreError::UniqueViolation("refresh token".to_string()));
        }

        tokens.insert(
            token.token_hash.clone(),
            RefreshTokenRecord {
                token_hash: token.token_hash.clone(),
                user_id: token.user_id,
                created_at: token.created_at,
                expires_at: token.expires_at,
                revoked_at: None,
            },
        );
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<RefreshTokenRecord, StoreError> {
        self.refresh_tokens
            .read()
            .map_err(|_| poisoned())?
            .get(token_hash)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn mark_refresh_token_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tokens = self.refresh_tokens.write().map_err(|_| poisoned())?;
        let record = tokens.get_mut(token_hash).ok_or(StoreError::NotFound)?;
        record.revoked_at.get_or_insert(revoked_at);
        Ok(())
    }
}
