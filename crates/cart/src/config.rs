//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_API_BASE_URL` - Base URL of the remote cart API (e.g., `https://api.example.com/v1/`)
//!
//! ## Optional
//! - `CART_API_TOKEN` - Bearer token of the logged-in customer
//! - `CART_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `CART_USER_AGENT` - `User-Agent` header (default: `storefront-cart/<version>`)
//! - `GUEST_CART_PATH` - JSON file holding the guest cart (default: `.guest-cart.json`)
//! - `LOG_FORMAT` - `text` or `json` (default: `text`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_GUEST_CART_PATH: &str = ".guest-cart.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

/// Remote cart API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CartApiConfig {
    /// Base URL all cart endpoints are resolved against
    pub base_url: Url,
    /// Customer bearer token, if a customer is logged in
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// `User-Agent` header value
    pub user_agent: String,
}

impl std::fmt::Debug for CartApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl CartApiConfig {
    /// Build a config for `base_url` with default timeout and user agent.
    ///
    /// A trailing slash is added to the path so relative endpoints such as
    /// `cart/items` resolve beneath it.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }

    /// Set the customer bearer token.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("CART_API_BASE_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CART_API_BASE_URL".to_string(), e.to_string())
        })?;
        let timeout_secs = get_env_or_default("CART_API_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CART_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let mut config = Self::new(base_url).with_timeout(Duration::from_secs(timeout_secs));
        config.token = get_optional_env("CART_API_TOKEN").map(SecretString::from);
        if let Some(user_agent) = get_optional_env("CART_USER_AGENT") {
            config.user_agent = user_agent;
        }
        Ok(config)
    }
}

/// Top-level cart configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Remote cart API configuration
    pub api: CartApiConfig,
    /// Where the guest cart is persisted
    pub guest_cart_path: PathBuf,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl CartConfig {
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

        let api = CartApiConfig::from_env()?;
        let guest_cart_path =
            PathBuf::from(get_env_or_default("GUEST_CART_PATH", DEFAULT_GUEST_CART_PATH));
        let log_format = get_env_or_default("LOG_FORMAT", "text")
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::InvalidEnvVar("LOG_FORMAT".to_string(), e))?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api,
            guest_cart_path,
            log_format,
            sentry_dsn,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn default_user_agent() -> String {
    format!("storefront-cart/{}", env!("CARGO_PKG_VERSION"))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
