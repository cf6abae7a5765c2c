use chrono::Duration;

use crate::auth::{
    DEFAULT_REFRESH_TOKEN_TTL_SECONDS, MAX_ACCESS_TOKEN_TTL_SECONDS, MAX_BCRYPT_COST,
    MAX_REFRESH_TOKEN_TTL_SECONDS, MIN_BCRYPT_COST,
};
use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Process-wide token settings. Read-only once the server starts.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// HMAC signing key for access tokens
    pub secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
}

impl AuthSettings {
    /// Access token lifetime, capped at one hour whatever was configured.
    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl_seconds.min(MAX_ACCESS_TOKEN_TTL_SECONDS))
    }

    /// Refresh token lifetime, never longer than a hundred years.
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_ttl_seconds.min(MAX_REFRESH_TOKEN_TTL_SECONDS))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.secret".to_string()));
        }
        if self.access_token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.access_token_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.refresh_token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.refresh_token_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.refresh_token_ttl_seconds > MAX_REFRESH_TOKEN_TTL_SECONDS {
            return Err(ConfigError::InvalidValue(format!(
                "auth.refresh_token_ttl_seconds must not exceed {}",
                MAX_REFRESH_TOKEN_TTL_SECONDS
            )));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.bcrypt_cost must be between {} and {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST
            )));
        }
        Ok(())
    }
}

/// Load settings from an optional `configuration` file, then `APP_*`
/// environment variables (`APP_AUTH__SECRET`, `APP_DATABASE__PASSWORD`, ...).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080_i64)?
        .set_default("database.username", "postgres")?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432_i64)?
        .set_default("database.database_name", "chirpy")?
        .set_default("auth.access_token_ttl_seconds", MAX_ACCESS_TOKEN_TTL_SECONDS)?
        .set_default("auth.refresh_token_ttl_seconds", DEFAULT_REFRESH_TOKEN_TTL_SECONDS)?
        .set_default("auth.bcrypt_cost", 10_i64)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
