/// Authentication module
///
/// Password hashing, stateless access tokens, store-backed refresh tokens,
/// bearer extraction and the service that combines them.

mod bearer;
mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use bearer::extract_bearer_token;
pub use claims::Claims;
pub use jwt::issue_access_token;
pub use jwt::issue_access_token_at;
pub use jwt::validate_access_token;
pub use jwt::validate_access_token_at;
pub use jwt::{MAX_ACCESS_TOKEN_TTL_SECONDS, TOKEN_ISSUER};
pub use password::PasswordHasher;
pub use password::{DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
pub use refresh_token::generate_refresh_token;
pub use refresh_token::RefreshTokenStore;
pub use refresh_token::{DEFAULT_REFRESH_TOKEN_TTL_SECONDS, MAX_REFRESH_TOKEN_TTL_SECONDS};
pub use service::{AuthService, LoginTokens, UserAccount};
