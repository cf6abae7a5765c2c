/// Authentication Routes
///
/// Login, access token refresh, refresh token revocation and an identity
/// echo for clients to check their access token.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, MAX_ACCESS_TOKEN_TTL_SECONDS};
use crate::error::{AppError, ValidationError};
use crate::middleware::Identity;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Optional shorter access token lifetime. Anything above one hour is
    /// clamped to one hour.
    pub expires_in_seconds: Option<i64>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

#[derive(Serialize)]
pub struct IdentityResponse {
    pub id: String,
}

/// POST /api/login
///
/// # Errors
/// - 400: empty email/password or non-positive `expires_in_seconds`.
///   Already-expired tokens cannot be requested this way.
/// - 401: "Incorrect email or password", whichever of the two was wrong
/// - 500: store failure
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    if form.email.trim().is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()).into());
    }
    if form.password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()).into());
    }

    let requested_ttl = match form.expires_in_seconds {
        None => None,
        Some(seconds) if seconds <= 0 => {
            return Err(ValidationError::OutOfRange("expires_in_seconds".to_string()).into());
        }
        Some(seconds) => Some(Duration::seconds(seconds.min(MAX_ACCESS_TOKEN_TTL_SECONDS))),
    };

    let tokens = auth
        .login(form.email.trim(), &form.password, requested_ttl)
        .await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: tokens.user_id.to_string(),
        created_at: tokens.created_at,
        updated_at: tokens.updated_at,
        email: tokens.handle,
        token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// POST /api/refresh
///
/// Takes the refresh token as `Authorization: Bearer <refresh_token>` and
/// returns a new access token. The refresh token is left untouched.
pub async fn refresh(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let token = auth.refresh(req.headers()).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse { token }))
}

/// POST /api/revoke
///
/// Takes the refresh token as bearer and revokes it. Repeating the call is
/// harmless.
pub async fn revoke(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.revoke(req.headers()).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me
///
/// **Requires a valid access token**; the identity is injected by
/// `RequireIdentity`.
pub async fn me(identity: web::ReqData<Identity>) -> HttpResponse {
    HttpResponse::Ok().json(IdentityResponse {
        id: identity.user_id.to_string(),
    })
}
