/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string for the public store (required)
/// - `PRIVATE_DATABASE_URL`: private store (default: `DATABASE_URL`)
/// - `DATABASE_MAX_CONNECTIONS`: pool size per store (default: 10)
/// - `RUN_MIGRATIONS`: apply migrations at startup (default: true)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: `*`)
/// - `PRODUCTION`: production mode flag (default: false)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 characters)
/// - `JWT_AUDIENCE`: expected token audience (default: depot)
/// - `JWT_LIFETIME_DAYS`: token lifetime (default: 7)
/// - `AUTH_BASIC_ON_READS`: accept Basic credentials on read endpoints (default: false)
/// - `DB_RETRIES`, `DB_BACKOFF_BASE_MS`, `DB_BACKOFF_EXPONENT`: retry policy (3 / 500 / 2)
/// - `RUST_LOG`: Log level (default: debug for the depot crates)
///
/// # Example
///
/// ```no_run
/// use depot_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use depot_shared::auth::jwt::JwtSettings;
use depot_shared::db::pool::PoolConfig;
use depot_shared::db::query::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Credential handling
    pub auth: AuthConfig,

    /// Retry policy for transient store failures
    pub retry: RetryConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` means any)
    pub cors_origins: Vec<String>,

    /// Production mode
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL of the public store
    pub url: String,

    /// PostgreSQL connection URL of the private store
    pub private_url: String,

    /// Maximum number of connections in each pool
    pub max_connections: u32,

    /// Apply pending migrations at startup
    pub run_migrations: bool,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Audience written to and required in tokens
    pub audience: String,

    /// Token lifetime in days
    pub lifetime_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Fall back to Basic credentials on read endpoints when no token is sent
    pub basic_on_reads: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_exponent: u32,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    /// - `JWT_SECRET` is shorter than 32 characters
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = parse_or(&lookup, "API_PORT", 8080u16)?;
        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        let production = flag_or(&lookup, "PRODUCTION", false)?;
        if production && cors_origins.iter().any(|origin| origin == "*") {
            anyhow::bail!("CORS_ORIGINS must list explicit origins when PRODUCTION is set");
        }

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let private_url = match lookup("PRIVATE_DATABASE_URL") {
            Some(url) => url,
            None => {
                tracing::warn!("PRIVATE_DATABASE_URL not set, private store shares DATABASE_URL");
                database_url.clone()
            }
        };

        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;
        let run_migrations = flag_or(&lookup, "RUN_MIGRATIONS", true)?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let lifetime_days = parse_or(&lookup, "JWT_LIFETIME_DAYS", 7i64)?;
        if lifetime_days <= 0 {
            anyhow::bail!("JWT_LIFETIME_DAYS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                private_url,
                max_connections,
                run_migrations,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "depot".to_string()),
                lifetime_days,
            },
            auth: AuthConfig {
                basic_on_reads: flag_or(&lookup, "AUTH_BASIC_ON_READS", false)?,
            },
            retry: RetryConfig {
                retries: parse_or(&lookup, "DB_RETRIES", 3u32)?,
                backoff_base_ms: parse_or(&lookup, "DB_BACKOFF_BASE_MS", 500u64)?,
                backoff_exponent: parse_or(&lookup, "DB_BACKOFF_EXPONENT", 2u32)?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn jwt_settings(&self) -> JwtSettings {
        JwtSettings {
            secret: self.jwt.secret.clone(),
            audience: self.jwt.audience.clone(),
            lifetime: chrono::Duration::days(self.jwt.lifetime_days),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retry.retries,
            backoff_base: Duration::from_millis(self.retry.backoff_base_ms),
            backoff_exponent: self.retry.backoff_exponent,
        }
    }

    /// Pool settings for the store at `url`
    pub fn pool_config(&self, url: &str) -> PoolConfig {
        PoolConfig {
            url: url.to_string(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

fn flag_or<F>(lookup: &F, key: &str, default: bool) -> anyhow::Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be a boolean, got {:?}", key, raw),
        },
    }
}
