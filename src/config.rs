//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables once at
//! startup. Nothing downstream reads the environment again.

use crate::error::AuthError;
use chrono::{Duration, Utc};
use std::env;
use std::str::FromStr;

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for signing tokens (from SECRET_KEY env var)
    pub secret_key: String,

    /// JWT signing algorithm name (from ALGORITHM env var)
    pub algorithm: String,

    /// Access token lifetime in minutes (from TOKEN_EXPIRES env var)
    pub token_expires_minutes: i64,

    /// Password reset token lifetime in minutes (from RESET_TOKEN_EXPIRES env var)
    pub reset_token_expires_minutes: i64,

    /// Frontend base URL used in reset links (from APP_URL env var)
    pub app_url: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        let secret_key = env::var("SECRET_KEY")
            .map_err(|_| AuthError::Config("SECRET_KEY must be set".to_string()))?;

        let token_expires_minutes = parse_var("TOKEN_EXPIRES", 30)?;

        let config = Self {
            secret_key,
            algorithm: env::var("ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
            token_expires_minutes,
            reset_token_expires_minutes: parse_var("RESET_TOKEN_EXPIRES", token_expires_minutes)?,
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            argon2_memory_cost: parse_var("ARGON2_MEMORY_COST", 19456)?, // 19 MiB
            argon2_time_cost: parse_var("ARGON2_TIME_COST", 2)?,
            argon2_parallelism: parse_var("ARGON2_PARALLELISM", 1)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.secret_key.is_empty() {
            return Err(AuthError::Config("SECRET_KEY must not be empty".to_string()));
        }

        if self.algorithm.trim().is_empty() {
            return Err(AuthError::Config("ALGORITHM must not be empty".to_string()));
        }

        ttl_from_minutes("TOKEN_EXPIRES", self.token_expires_minutes)?;
        ttl_from_minutes("RESET_TOKEN_EXPIRES", self.reset_token_expires_minutes)?;

        Ok(())
    }

    /// Lifetime of login tokens
    pub fn token_ttl(&self) -> Result<Duration, AuthError> {
        ttl_from_minutes("TOKEN_EXPIRES", self.token_expires_minutes)
    }

    /// Lifetime of password reset tokens
    pub fn reset_token_ttl(&self) -> Result<Duration, AuthError> {
        ttl_from_minutes("RESET_TOKEN_EXPIRES", self.reset_token_expires_minutes)
    }
}

/// A positive lifetime that can still be added to the current time
fn ttl_from_minutes(name: &str, minutes: i64) -> Result<Duration, AuthError> {
    if minutes <= 0 {
        return Err(AuthError::Config(format!("{name} must be positive")));
    }

    let ttl = Duration::try_minutes(minutes)
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| AuthError::Config(format!("{name} is too large: {minutes}")))?;

    Ok(ttl)
}

/// SMTP settings for outgoing mail
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl MailConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            server: required_var("MAIL_SERVER")?,
            port: parse_var("MAIL_PORT", 587)?,
            username: required_var("MAIL_USERNAME")?,
            password: required_var("MAIL_PASSWORD")?,
            from: required_var("MAIL_FROM")?,
        })
    }
}

/// Process-level settings: listen address and database
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
}

impl ServerConfig {
    /// `DATABASE_URL` wins; otherwise the URL is assembled from the `PG_*` variables.
    pub fn from_env() -> Result<Self, AuthError> {
        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "postgresql://{}:{}@{}/{}",
                required_var("PG_USER")?,
                required_var("PG_PASSWORD")?,
                required_var("PG_HOST")?,
                required_var("PG_DATABASE")?,
            ),
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: parse_var("PORT", 5000)?,
            database_url,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required_var(name: &str) -> Result<String, AuthError> {
    env::var(name).map_err(|_| AuthError::Config(format!("{name} must be set")))
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AuthError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AuthError::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            secret_key: "a".repeat(32),
            algorithm: "HS256".to_string(),
            token_expires_minutes: 30,
            reset_token_expires_minutes: 30,
            app_url: "http://localhost:3000".to_string(),
            argon2_memory_cost: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_secret() {
        let config = AuthConfig {
            secret_key: String::new(),
            ..config()
        };

        assert!(matches!(config.validate(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_config_validation_empty_algorithm() {
        let config = AuthConfig {
            algorithm: " ".to_string(),
            ..config()
        };

        assert!(matches!(config.validate(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_config_validation_non_positive_ttl() {
        let config = AuthConfig {
            reset_token_expires_minutes: 0,
            ..config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ttl_helpers() {
        let config = AuthConfig {
            reset_token_expires_minutes: 15,
            ..config()
        };

        assert_eq!(config.token_ttl().unwrap(), Duration::minutes(30));
        assert_eq!(config.reset_token_ttl().unwrap(), Duration::minutes(15));
    }

    #[test]
    fn test_config_validation_oversized_ttl() {
        let config = AuthConfig {
            token_expires_minutes: 1_000_000_000_000,
            ..config()
        };
        assert!(matches!(config.validate(), Err(AuthError::Config(_))));
        assert!(matches!(config.token_ttl(), Err(AuthError::Config(_))));

        let config = AuthConfig {
            reset_token_expires_minutes: i64::MAX,
            ..self::config()
        };
        assert!(matches!(config.validate(), Err(AuthError::Config(_))));
        assert!(matches!(config.reset_token_ttl(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_env_file_does_not_override_process_env() {
        env::remove_var("DATABASE_URL");
        env::set_var("PORT", "5100");
        dotenvy::from_read("DATABASE_URL=postgresql://u:p@db/auth\nPORT=6000\n".as_bytes())
            .unwrap();

        let server = ServerConfig::from_env().unwrap();
        assert_eq!(server.database_url, "postgresql://u:p@db/auth");
        assert_eq!(server.port, 5100);
    }
}
