//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL (e.g. `sqlite:./solidarity.db`)
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Upper bound on pooled database connections
    pub max_connections: u32,
    /// HMAC secret used to sign and verify bearer tokens
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens, in hours
    pub token_ttl_hours: i64,
    /// Email of an administrator to create at startup when missing
    pub bootstrap_admin_email: Option<String>,
    /// Display name for the bootstrapped administrator
    pub bootstrap_admin_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env_var("JWT_SECRET").map_err(|_| {
            ApiError::Config("JWT_SECRET environment variable is required".to_string())
        })?;
        if jwt_secret.len() < 16 {
            return Err(ApiError::Config(
                "JWT_SECRET must be at least 16 characters".to_string(),
            ));
        }

        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./solidarity.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            max_connections: env_var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid DB_MAX_CONNECTIONS".to_string()))?,
            jwt_secret,
            token_ttl_hours: env_var("TOKEN_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .ok()
                .filter(|hours: &i64| *hours > 0)
                .ok_or_else(|| ApiError::Config("Invalid TOKEN_TTL_HOURS".to_string()))?,
            bootstrap_admin_email: env_var("BOOTSTRAP_ADMIN_EMAIL").ok(),
            bootstrap_admin_name: env_var("BOOTSTRAP_ADMIN_NAME")
                .unwrap_or_else(|_| "Administrator".to_string()),
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}
