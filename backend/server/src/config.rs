//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// HS256 signing key for bearer tokens
    pub jwt_secret: String,
    /// Lifetime of an issued token, in seconds
    pub token_ttl_secs: u64,
    /// Page size used when a listing request does not ask for one
    pub default_page_size: u32,
    /// Upper bound on any requested page size
    pub max_page_size: u32,
    /// Bootstrap admin account, created on startup if both are set
    pub admin_dni: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./raee.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            jwt_secret: env_var("JWT_SECRET").map_err(|_| {
                ApiError::Config("JWT_SECRET environment variable is required".to_string())
            })?,
            token_ttl_secs: env_var("TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid TOKEN_TTL_SECS".to_string()))?,
            default_page_size: env_var("DEFAULT_PAGE_SIZE")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid DEFAULT_PAGE_SIZE".to_string()))?,
            max_page_size: env_var("MAX_PAGE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid MAX_PAGE_SIZE".to_string()))?,
            admin_dni: env_var("ADMIN_DNI").ok(),
            admin_password: env_var("ADMIN_PASSWORD").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ApiError::Config("JWT_SECRET must not be empty".to_string()));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(ApiError::Config("Page sizes must be positive".to_string()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ApiError::Config(
                "DEFAULT_PAGE_SIZE exceeds MAX_PAGE_SIZE".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}

#[cfg(test)]
impl Config {
    /// Configuration for an in-memory database, used by handler tests.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            api_port: 0,
            jwt_secret: "test-secret".to_string(),
            token_ttl_secs: 3600,
            default_page_size: 20,
            max_page_size: 50,
            admin_dni: None,
            admin_password: None,
        }
    }
}
