//! Signup and credential change

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, UserAccount};
use crate::error::{AppError, ValidationError};

#[derive(Deserialize)]
pub struct CredentialRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
}

impl From<UserAccount> for UserResponse {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.user_id.to_string(),
            created_at: account.created_at,
            updated_at: account.updated_at,
            email: account.handle,
        }
    }
}

fn required_email(form: &CredentialRequest) -> Result<&str, ValidationError> {
    let email = form.email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    Ok(email)
}

/// POST /api/users
///
/// # Errors
/// - 400: empty email
/// - 409: email already registered
/// - 500: the password could not be hashed (an empty one cannot)
pub async fn create_user(
    form: web::Json<CredentialRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let email = required_email(&form)?;
    let account = auth.register(email, &form.password).await?;

    Ok(HttpResponse::Created().json(UserResponse::from(account)))
}

/// PUT /api/users
///
/// **Requires a valid access token.** Replaces the caller's email and
/// password; refresh tokens already issued keep working.
pub async fn update_user(
    req: HttpRequest,
    form: web::Json<CredentialRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let email = required_email(&form)?;
    let account = auth
        .update_credential(req.headers(), email, &form.password)
        .await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(account)))
}
