//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SWEETSHOP_HOST` - Bind address (default: 0.0.0.0)
//! - `SWEETSHOP_PORT` - Listen port (default: 8080)
//! - `JWT_SECRET` - HS256 secret for bearer tokens (insecure dev default if unset)
//! - `USE_PERSISTENT_STORES` - `true` to use Postgres instead of the in-memory store
//! - `DATABASE_URL` - `PostgreSQL` connection string (required when persistent)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `SWEETSHOP_LOCK_TIMEOUT_MS` - Lock acquisition bound per transaction (default: 5000)
//! - `SWEETSHOP_SEED_FILE` - JSON catalog seed applied at startup
//! - `LOG_FORMAT` - `json` or `pretty` (default: json)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use sweetshop_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where storefront data lives.
#[derive(Clone)]
pub enum StoreConfig {
    InMemory,
    Postgres {
        /// Connection URL (contains password)
        database_url: String,
        max_connections: u32,
    },
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::InMemory => f.write_str("InMemory"),
            StoreConfig::Postgres {
                max_connections, ..
            } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .field("max_connections", max_connections)
                .finish(),
        }
    }
}

/// API application configuration.
///
/// Implements `Debug` manually to redact the JWT secret.
#[derive(Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// HS256 bearer token secret
    pub jwt_secret: String,
    pub store: StoreConfig,
    /// Upper bound on waiting for a row or store lock
    pub lock_timeout: Duration,
    pub seed_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("store", &self.store)
            .field("lock_timeout", &self.lock_timeout)
            .field("seed_file", &self.seed_file)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but unparsable, or if
    /// persistent stores are requested without `DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get_optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or_default =
            |key: &str, default: &str| get_optional(key).unwrap_or_else(|| default.to_string());

        let host = parse_env("SWEETSHOP_HOST", &get_or_default("SWEETSHOP_HOST", "0.0.0.0"))?;
        let port = parse_env("SWEETSHOP_PORT", &get_or_default("SWEETSHOP_PORT", "8080"))?;

        let jwt_secret = get_optional("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let use_persistent: bool = parse_env(
            "USE_PERSISTENT_STORES",
            &get_or_default("USE_PERSISTENT_STORES", "false"),
        )?;
        let store = if use_persistent {
            StoreConfig::Postgres {
                database_url: get_optional("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?,
                max_connections: parse_env(
                    "DATABASE_MAX_CONNECTIONS",
                    &get_or_default("DATABASE_MAX_CONNECTIONS", "10"),
                )?,
            }
        } else {
            StoreConfig::InMemory
        };

        let lock_timeout_ms: u64 = parse_env(
            "SWEETSHOP_LOCK_TIMEOUT_MS",
            &get_or_default("SWEETSHOP_LOCK_TIMEOUT_MS", "5000"),
        )?;

        let seed_file = get_optional("SWEETSHOP_SEED_FILE").map(PathBuf::from);
        let log_format = parse_env("LOG_FORMAT", &get_or_default("LOG_FORMAT", "json"))?;

        Ok(Self {
            host,
            port,
            jwt_secret,
            store,
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            seed_file,
            log_format,
        })
    }

    /// True when `JWT_SECRET` was not provided and the dev default is in use.
    pub fn uses_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
