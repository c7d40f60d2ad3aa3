//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (https enables secure cookies)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_STATIC_DIR` - Static asset directory (default: crates/storefront/static)
//! - `STOREFRONT_STORAGE_QUOTA_BYTES` - Per-session storage limit (default: 5 MiB)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use furnilux_core::storage::DEFAULT_QUOTA_BYTES;
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Maximum bytes a single session may store
    pub storage_quota_bytes: usize,
    /// Sentry DSN for error tracking (contains a key)
    pub sentry_dsn: Option<SecretString>,
    /// Sentry environment name (e.g., production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
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

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let sample_rate = env.parse_or("SENTRY_SAMPLE_RATE", 1.0)?;
        let traces_sample_rate = env.parse_or("SENTRY_TRACES_SAMPLE_RATE", 0.0)?;

        Ok(Self {
            host: env.parse_or("STOREFRONT_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: env.parse_or("STOREFRONT_PORT", 3000)?,
            base_url: env.required("STOREFRONT_BASE_URL")?,
            static_dir: env
                .optional("STOREFRONT_STATIC_DIR")
                .map_or_else(|| PathBuf::from("crates/storefront/static"), PathBuf::from),
            storage_quota_bytes: env
                .parse_or("STOREFRONT_STORAGE_QUOTA_BYTES", DEFAULT_QUOTA_BYTES)?,
            sentry_dsn: env.optional("SENTRY_DSN").map(SecretString::from),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: validate_rate("SENTRY_SAMPLE_RATE", sample_rate)?,
            sentry_traces_sample_rate: validate_rate(
                "SENTRY_TRACES_SAMPLE_RATE",
                traces_sample_rate,
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
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
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Validate that a sample rate lies in `0.0..=1.0`.
fn validate_rate(key: &str, rate: f32) -> Result<f32, ConfigError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("STOREFRONT_BASE_URL", "http://localhost:3000")]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.storage_quota_bytes, 5 * 1024 * 1024);
        assert_eq!(config.static_dir, PathBuf::from("crates/storefront/static"));
        assert!(config.sentry_dsn.is_none());
        assert!(!config.is_secure());
    }

    #[test]
    fn test_missing_base_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "STOREFRONT_BASE_URL"));
    }

    #[test]
    fn test_blank_value_is_unset() {
        let err = load(&[("STOREFRONT_BASE_URL", "   ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "STOREFRONT_PORT"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STOREFRONT_BASE_URL", "https://furnilux.example"),
            ("STOREFRONT_HOST", "0.0.0.0"),
            ("STOREFRONT_PORT", "8080"),
            ("STOREFRONT_STORAGE_QUOTA_BYTES", "1024"),
            ("SENTRY_DSN", "https://key@sentry.example/1"),
            ("SENTRY_SAMPLE_RATE", "0.5"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.storage_quota_bytes, 1024);
        assert!(config.is_secure());
        assert_eq!(
            config.sentry_dsn.as_ref().unwrap().expose_secret(),
            "https://key@sentry.example/1"
        );
        assert!((config.sentry_sample_rate - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sample_rate_out_of_range() {
        let err = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("SENTRY_TRACES_SAMPLE_RATE", "2"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_debug_redacts_sentry_dsn() {
        let config = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("SENTRY_DSN", "https://super_secret_key@sentry.example/1"),
        ])
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("super_secret_key"));
    }
}
