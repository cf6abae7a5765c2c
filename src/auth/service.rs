/// Authentication service
///
/// Ties the password hasher, the access token codec, the refresh token store
/// and bearer extraction into the request flows: login, authenticated
/// request, refresh and revoke, plus signup and credential change.
///
/// Access tokens are checked statelessly; refresh tokens are checked against
/// the store. The two paths stay separate.

use actix_web::http::header::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::bearer::extract_bearer_token;
use crate::auth::jwt::{issue_access_token_at, validate_access_token_at};
use crate::auth::password::PasswordHasher;
use crate::auth::refresh_token::RefreshTokenStore;
use crate::clock::Clock;
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, StoreError};
use crate::store::{Credential, CredentialStore, CredentialUpdate, NewCredential};

/// Verified against when the handle is unknown, so both login failures cost
/// one bcrypt verify.
const DUMMY_PASSWORD: &str = "chirpy-dummy-password";

/// Public view of a user's credential. The hash never leaves the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub user_id: Uuid,
    pub handle: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Credential> for UserAccount {
    fn from(credential: Credential) -> Self {
        Self {
            user_id: credential.user_id,
            handle: credential.handle,
            created_at: credential.created_at,
            updated_at: credential.updated_at,
        }
    }
}

/// What a successful login hands back to the client
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub user_id: Uuid,
    pub handle: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    refresh_tokens: RefreshTokenStore,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
    secret: String,
    access_token_ttl: Duration,
    dummy_hash: Option<Arc<str>>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        settings: &AuthSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let refresh_tokens =
            RefreshTokenStore::new(store.clone(), clock.clone(), settings.refresh_token_ttl());
        let hasher = PasswordHasher::new(settings.bcrypt_cost);

        let dummy_hash = match hasher.hash(DUMMY_PASSWORD) {
            Ok(hash) => Some(Arc::from(hash)),
            Err(e) => {
                tracing::error!(error = %e, "Could not prepare dummy password hash");
                None
            }
        };

        Self {
            store,
            refresh_tokens,
            hasher,
            clock,
            secret: settings.secret.clone(),
            access_token_ttl: settings.access_token_ttl(),
            dummy_hash,
        }
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenStore {
        &self.refresh_tokens
    }

    /// Verify `handle`/`password` and mint an access + refresh token pair.
    ///
    /// `requested_ttl` may shorten the access token lifetime, never extend it.
    ///
    /// # Errors
    /// - `AuthError::CredentialInvalid` for an unknown handle, a wrong
    ///   password or an unreadable stored hash, indistinguishably
    /// - store errors other than "not found"
    pub async fn login(
        &self,
        handle: &str,
        password: &str,
        requested_ttl: Option<Duration>,
    ) -> Result<LoginTokens, AppError> {
        let credential = match self.store.find_credential_by_handle(handle).await {
            Ok(credential) => credential,
            Err(StoreError::NotFound) => {
                if let Some(dummy_hash) = &self.dummy_hash {
                    let _ = self.verify_password(dummy_hash, password).await?;
                }
                tracing::info!("Login attempt for unknown handle");
                return Err(AuthError::CredentialInvalid.into());
            }
            Err(e) => return Err(e.into()),
        };

        match self.verify_password(&credential.password_hash, password).await? {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(user_id = %credential.user_id, "Login attempt with wrong password");
                return Err(AuthError::CredentialInvalid.into());
            }
            Err(e) => {
                tracing::error!(
                    user_id = %credential.user_id,
                    error = %e,
                    "Stored password hash is unreadable"
                );
                return Err(AuthError::CredentialInvalid.into());
            }
        }

        let ttl = requested_ttl
            .map(|ttl| ttl.min(self.access_token_ttl))
            .unwrap_or(self.access_token_ttl);
        let access_token = self.issue_access_token(&credential.user_id, ttl)?;
        let refresh_token = self.refresh_tokens.issue(credential.user_id).await?;

        tracing::info!(user_id = %credential.user_id, "User logged in");

        Ok(LoginTokens {
            user_id: credential.user_id,
            handle: credential.handle,
            created_at: credential.created_at,
            updated_at: credential.updated_at,
            access_token,
            refresh_token,
            expires_in: ttl.num_seconds(),
        })
    }

    /// Identity behind the access token presented with a request.
    ///
    /// This is the single check every protected endpoint goes through.
    ///
    /// # Errors
    /// `HeaderMissing`, `MalformedHeader`, `TokenInvalid` or `TokenExpired`
    pub fn resolve_request_identity(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        let token = extract_bearer_token(headers)?;
        validate_access_token_at(&token, &self.secret, self.clock.now())
    }

    /// Mint a new access token from the refresh token presented as bearer.
    ///
    /// The refresh token stays valid and can be used again.
    ///
    /// # Errors
    /// Header errors, `TokenNotFound`, `TokenRevoked` or `TokenExpired`
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String, AppError> {
        let token = extract_bearer_token(headers)?;
        let user_id = self.refresh_tokens.resolve_identity(&token).await?;

        let access_token = self.issue_access_token(&user_id, self.access_token_ttl)?;
        tracing::info!(user_id = %user_id, "Access token refreshed");

        Ok(access_token)
    }

    /// Revoke the refresh token presented as bearer. Safe to repeat.
    ///
    /// # Errors
    /// Header errors or `TokenNotFound`
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let token = extract_bearer_token(headers)?;
        self.refresh_tokens.revoke(&token).await?;

        tracing::info!("Refresh token revoked");
        Ok(())
    }

    /// Create a credential for `handle` with a freshly salted hash.
    ///
    /// # Errors
    /// - `AuthError::Hashing` if the password cannot be hashed (e.g. empty)
    /// - `StoreError::UniqueViolation` if the handle is taken
    pub async fn register(&self, handle: &str, password: &str) -> Result<UserAccount, AppError> {
        let password_hash = self.hash_password(password).await?;

        let credential = self
            .store
            .insert_credential(&NewCredential {
                user_id: Uuid::new_v4(),
                handle: handle.to_string(),
                password_hash,
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!(user_id = %credential.user_id, "User registered");
        Ok(credential.into())
    }

    /// Replace the handle and password of the user behind the access token
    /// presented with the request. Existing refresh tokens stay valid.
    ///
    /// # Errors
    /// - header and access token errors, as for `resolve_request_identity`
    /// - `TokenInvalid` if the token's user no longer exists
    /// - `AuthError::Hashing` if the password cannot be hashed
    /// - `StoreError::UniqueViolation` if another user holds the handle
    pub async fn update_credential(
        &self,
        headers: &HeaderMap,
        handle: &str,
        password: &str,
    ) -> Result<UserAccount, AppError> {
        let user_id = self.resolve_request_identity(headers)?;
        let password_hash = self.hash_password(password).await?;

        let credential = self
            .store
            .update_credential(&CredentialUpdate {
                user_id,
                handle: handle.to_string(),
                password_hash,
                updated_at: self.clock.now(),
            })
            .await
            .map_err(|e| match e {
                StoreError::NotFound => {
                    tracing::warn!(user_id = %user_id, "Access token for a deleted user");
                    AppError::Auth(AuthError::TokenInvalid)
                }
                other => AppError::Store(other),
            })?;

        tracing::info!(user_id = %user_id, "Credential updated");
        Ok(credential.into())
    }

    fn issue_access_token(&self, user_id: &Uuid, ttl: Duration) -> Result<String, AppError> {
        issue_access_token_at(user_id, &self.secret, ttl, self.clock.now())
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher;
        let password = password.to_string();

        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;
        Ok(hash)
    }

    /// bcrypt verify on the blocking pool. The inner result is the verify
    /// outcome; the outer one only fails if the task itself does.
    async fn verify_password(
        &self,
        hash: &str,
        password: &str,
    ) -> Result<Result<bool, AuthError>, AppError> {
        let hasher = self.hasher;
        let hash = hash.to_string();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&hash, &password))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
    }
}
