//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `EMPORIUM_API_URL` - Backend base URL (default: `http://127.0.0.1:8000`)
//! - `EMPORIUM_DATA_DIR` - Directory for the cart and wishlist files (default: `.emporium`)
//! - `EMPORIUM_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 15)
//! - `EMPORIUM_CACHE_TTL_SECS` - Catalog cache lifetime in seconds (default: 300)
//! - `EMPORIUM_ACCESS_TOKEN` - Bearer token for authenticated endpoints
//! - `EMPORIUM_CURRENCY` - Currency prices are shown in (default: `BDT`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use emporium_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_DATA_DIR: &str = ".emporium";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Backend base URL, without a trailing slash
    pub api_url: Url,
    /// Directory holding persisted stores
    pub data_dir: PathBuf,
    /// Per-request timeout
    pub http_timeout: Duration,
    /// How long catalog responses stay cached
    pub cache_ttl: Duration,
    /// Bearer token for authenticated endpoints
    pub access_token: Option<SecretString>,
    /// Currency prices are shown in
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url.as_str())
            .field("data_dir", &self.data_dir)
            .field("http_timeout", &self.http_timeout)
            .field("cache_ttl", &self.cache_ttl)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("currency", &self.currency)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_env_or_default("EMPORIUM_API_URL", DEFAULT_API_URL))?;
        let data_dir = PathBuf::from(get_env_or_default("EMPORIUM_DATA_DIR", DEFAULT_DATA_DIR));
        let http_timeout = Duration::from_secs(get_secs(
            "EMPORIUM_HTTP_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        let cache_ttl = Duration::from_secs(get_secs(
            "EMPORIUM_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?);
        let access_token = get_optional_env("EMPORIUM_ACCESS_TOKEN").map(SecretString::from);
        let currency = get_env_or_default("EMPORIUM_CURRENCY", "BDT")
            .parse()
            .map_err(|e: emporium_core::UnknownCurrency| {
                ConfigError::InvalidEnvVar("EMPORIUM_CURRENCY".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_url,
            data_dir,
            http_timeout,
            cache_ttl,
            access_token,
            currency,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration for a backend at `api_url` with every other setting at
    /// its default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `api_url` is not an absolute URL.
    pub fn for_api(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            access_token: None,
            currency: CurrencyCode::default(),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// The base URL as a string without a trailing slash.
    #[must_use]
    pub fn api_base(&self) -> &str {
        self.api_url.as_str().trim_end_matches('/')
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the backend URL, stripping trailing slashes.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    Url::parse(trimmed)
        .map_err(|e| ConfigError::InvalidEnvVar("EMPORIUM_API_URL".to_string(), e.to_string()))
}

/// Get a duration in whole seconds, rejecting zero.
fn get_secs(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}
