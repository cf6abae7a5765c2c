use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    Credential, CredentialStore, CredentialUpdate, NewCredential, NewRefreshToken,
    RefreshTokenRecord,
};
use crate::error::StoreError;

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type CredentialRow = (Uuid, String, String, DateTime<Utc>, DateTime<Utc>);

fn into_credential(row: CredentialRow) -> Credential {
    let (user_id, handle, password_hash, created_at, updated_at) = row;
    Credential {
        user_id,
        handle,
        password_hash,
        created_at,
        updated_at,
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_credential_by_handle(&self, handle: &str) -> Result<Credential, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, email, hashed_password, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(into_credential(row))
    }

    async fn insert_credential(
        &self,
        credential: &NewCredential,
    ) -> Result<Credential, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            INSERT INTO users (id, created_at, updated_at, email, hashed_password)
            VALUES ($1, $2, $2, $3, $4)
            RETURNING id, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(credential.user_id)
        .bind(credential.created_at)
        .bind(&credential.handle)
        .bind(&credential.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(into_credential(row))
    }

    async fn update_credential(&self, update: &CredentialUpdate) -> Result<Credential, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            UPDATE users
            SET email = $1, hashed_password = $2, updated_at = $3
            WHERE id = $4
            RETURNING id, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(&update.handle)
        .bind(&update.password_hash)
        .bind(update.updated_at)
        .bind(update.user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(into_credential(row))
    }

    async fn insert_refresh_token(&self, token: &NewRefreshToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $3, $4)
            "#,
        )
        .bind(&token.token_hash)
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let row = sqlx::query_as::<
            _,
            (String, Uuid, DateTime<Utc>, DateTime<Utc>, Option<DateTime<Utc>>),
        >(
            r#"
            SELECT token_hash, user_id, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        let (token_hash, user_id, created_at, expires_at, revoked_at) = row;
        Ok(RefreshTokenRecord {
            token_hash,
            user_id,
            created_at,
            expires_at,
            revoked_at,
        })
    }

    async fn mark_refresh_token_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // COALESCE keeps the first revocation time when called again.
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $1), updated_at = $1
            WHERE token_hash = $2
            "#,
        )
        .bind(revoked_at)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
