//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (unless `STOREFRONT_STORAGE=memory`)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_STORAGE` - `postgres` (default) or `memory`
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 5000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: <http://localhost:5000>); `https` enables secure cookies
//! - `STOREFRONT_ALLOWED_ORIGINS` - Comma-separated origins allowed to call the API with credentials
//! - `STOREFRONT_RATE_LIMIT` - Rate limit login and signup (default: true)
//! - `STOREFRONT_SESSION_DAYS` - Session inactivity expiry in days (default: 7)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where customers, products and orders live.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// `PostgreSQL` (connection URL contains a password).
    Postgres { database_url: SecretString },
    /// Process memory; everything is lost on restart.
    Memory,
}

/// Sentry error tracking settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Persistence backend
    pub storage: StorageBackend,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Origins allowed to make credentialed cross-origin requests
    pub allowed_origins: Vec<String>,
    /// Whether login and signup are rate limited
    pub rate_limit: bool,
    /// Session inactivity expiry in days
    pub session_days: i64,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(get);

        let storage = match env.or_default("STOREFRONT_STORAGE", "postgres").as_str() {
            "postgres" => StorageBackend::Postgres {
                database_url: env.database_url("STOREFRONT_DATABASE_URL")?,
            },
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STOREFRONT_STORAGE".to_string(),
                    format!("expected postgres or memory, got {other}"),
                ));
            }
        };

        Ok(Self {
            storage,
            host: env.parsed("STOREFRONT_HOST", "127.0.0.1")?,
            port: env.parsed("STOREFRONT_PORT", "5000")?,
            base_url: env.or_default("STOREFRONT_BASE_URL", "http://localhost:5000"),
            allowed_origins: env
                .optional("STOREFRONT_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(ToOwned::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit: env.parsed("STOREFRONT_RATE_LIMIT", "true")?,
            session_days: env.parsed("STOREFRONT_SESSION_DAYS", "7")?,
            sentry: SentryConfig {
                dsn: env.optional("SENTRY_DSN"),
                environment: env.optional("SENTRY_ENVIRONMENT"),
                sample_rate: env.parsed("SENTRY_SAMPLE_RATE", "1.0")?,
                traces_sample_rate: env.parsed("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
            },
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies must be marked `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_memory_storage() {
        let config = load(&[("STOREFRONT_STORAGE", "memory")]).unwrap();
        assert!(matches!(config.storage, StorageBackend::Memory));
        assert_eq!(config.port, 5000);
        assert!(config.rate_limit);
        assert_eq!(config.session_days, 7);
        assert!(config.allowed_origins.is_empty());
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "STOREFRONT_DATABASE_URL"));
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/fruit")]).unwrap();
        match config.storage {
            StorageBackend::Postgres { database_url } => {
                assert_eq!(database_url.expose_secret(), "postgres://localhost/fruit");
            }
            StorageBackend::Memory => panic!("expected postgres"),
        }
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("STOREFRONT_STORAGE", "mongo")]).is_err());
        assert!(load(&[("STOREFRONT_STORAGE", "memory"), ("STOREFRONT_PORT", "http")]).is_err());
        assert!(
            load(&[("STOREFRONT_STORAGE", "memory"), ("STOREFRONT_RATE_LIMIT", "maybe")]).is_err()
        );
    }

    #[test]
    fn test_allowed_origins_and_secure_cookies() {
        let config = load(&[
            ("STOREFRONT_STORAGE", "memory"),
            ("STOREFRONT_BASE_URL", "https://fruit.example"),
            ("STOREFRONT_ALLOWED_ORIGINS", "http://localhost:5173, https://fruit.example ,"),
        ])
        .unwrap();
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:5173", "https://fruit.example"]
        );
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_socket_addr() {
        let config = load(&[
            ("STOREFRONT_STORAGE", "memory"),
            ("STOREFRONT_HOST", "0.0.0.0"),
            ("STOREFRONT_PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_debug_does_not_leak_database_url() {
        let config = load(&[("STOREFRONT_DATABASE_URL", "postgres://user:hunter2@db/fruit")]).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
