//! Client configuration for the BambooHR API.
//!
//! Values come from the environment (optionally seeded from a `.env` file) and
//! are assembled once at startup into an immutable [`ClientConfig`].

use std::{env, fmt, str::FromStr, sync::LazyLock, time::Duration};

use anyhow::{Result, anyhow};

use crate::mcp::error::BambooHrError;

pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 30_000;

// Load configuration from environment variables
pub static BAMBOOHR_API_KEY: LazyLock<Result<String>> = LazyLock::new(|| {
    env::var("BAMBOOHR_API_KEY").map_err(|e| anyhow!("BAMBOOHR_API_KEY must be set: {e}"))
});

pub static BAMBOOHR_SUBDOMAIN: LazyLock<Result<String>> = LazyLock::new(|| {
    env::var("BAMBOOHR_SUBDOMAIN").map_err(|e| anyhow!("BAMBOOHR_SUBDOMAIN must be set: {e}"))
});

pub static BAMBOOHR_BASE_URL: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("BAMBOOHR_BASE_URL").ok().filter(|v| !v.trim().is_empty()));

/// Immutable settings for one client instance.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub subdomain: String,
    pub base_url: String,
    pub cache_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("subdomain", &self.subdomain)
            .field("base_url", &self.base_url)
            .field("cache_timeout_ms", &self.cache_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_retry_attempts", &self.max_retry_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .finish()
    }
}

/// Formats a subdomain into the BambooHR gateway base URL.
///
/// Example: `"acme"` → `"https://api.bamboohr.com/api/gateway.php/acme/v1"`
pub fn subdomain_to_base_url(subdomain: &str) -> String {
    format!("https://api.bamboohr.com/api/gateway.php/{subdomain}/v1")
}

/// A subdomain is non-empty and limited to ASCII letters, digits and `-`.
pub fn is_valid_subdomain(subdomain: &str) -> bool {
    !subdomain.is_empty()
        && subdomain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl ClientConfig {
    /// Creates a config with default timeouts and retry settings.
    pub fn new(api_key: impl Into<String>, subdomain: impl Into<String>) -> Self {
        let subdomain = subdomain.into();
        Self {
            api_key: api_key.into(),
            base_url: subdomain_to_base_url(&subdomain),
            subdomain,
            cache_timeout_ms: DEFAULT_CACHE_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }

    /// Points the client at a different gateway, e.g. a proxy or a mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn with_cache_timeout_ms(mut self, ms: u64) -> Self {
        self.cache_timeout_ms = ms;
        self
    }

    #[must_use]
    pub const fn with_request_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    #[must_use]
    pub const fn with_retry(
        mut self,
        max_attempts: u32,
        base_delay_ms: u64,
        max_delay_ms: u64,
    ) -> Self {
        self.max_retry_attempts = max_attempts;
        self.retry_base_delay_ms = base_delay_ms;
        self.retry_max_delay_ms = max_delay_ms;
        self
    }

    pub const fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Builds the config from `BAMBOOHR_*` environment variables.
    ///
    /// # Errors
    /// * `MissingConfig` - `BAMBOOHR_API_KEY` or `BAMBOOHR_SUBDOMAIN` not set or empty
    /// * `InvalidConfig` - malformed subdomain or a numeric override that does not parse
    pub fn from_env() -> Result<Self, BambooHrError> {
        let api_key = BAMBOOHR_API_KEY
            .as_ref()
            .map_err(|e| BambooHrError::MissingConfig(e.to_string()))?;
        let subdomain = BAMBOOHR_SUBDOMAIN
            .as_ref()
            .map_err(|e| BambooHrError::MissingConfig(e.to_string()))?;

        if api_key.trim().is_empty() {
            return Err(BambooHrError::MissingConfig(
                "BAMBOOHR_API_KEY is set but empty".to_string(),
            ));
        }
        let subdomain = subdomain.trim();
        if !is_valid_subdomain(subdomain) {
            return Err(BambooHrError::InvalidConfig(format!(
                "BAMBOOHR_SUBDOMAIN must contain only letters, digits and hyphens, got '{subdomain}'"
            )));
        }

        let mut config = Self::new(api_key.trim(), subdomain);
        if let Some(base_url) = BAMBOOHR_BASE_URL.as_ref() {
            config = config.with_base_url(base_url.trim());
        }
        config.with_overrides(&|name: &str| env::var(name).ok())
    }

    /// Applies the numeric `BAMBOOHR_*` overrides found by `lookup`, keeping
    /// the defaults for names it does not know.
    fn with_overrides(
        self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, BambooHrError> {
        Ok(self
            .with_cache_timeout_ms(override_or(
                lookup,
                "BAMBOOHR_CACHE_TIMEOUT_MS",
                DEFAULT_CACHE_TIMEOUT_MS,
            )?)
            .with_request_timeout_ms(override_or(
                lookup,
                "BAMBOOHR_REQUEST_TIMEOUT_MS",
                DEFAULT_REQUEST_TIMEOUT_MS,
            )?)
            .with_retry(
                override_or(lookup, "BAMBOOHR_MAX_RETRIES", DEFAULT_MAX_RETRY_ATTEMPTS)?,
                override_or(lookup, "BAMBOOHR_RETRY_BASE_DELAY_MS", DEFAULT_RETRY_BASE_DELAY_MS)?,
                override_or(lookup, "BAMBOOHR_RETRY_MAX_DELAY_MS", DEFAULT_RETRY_MAX_DELAY_MS)?,
            ))
    }
}

fn override_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, BambooHrError> {
    lookup(name).map_or(Ok(default), |raw| parse_number(name, &raw))
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T, BambooHrError> {
    raw.trim().parse().map_err(|_| {
        BambooHrError::InvalidConfig(format!(
            "{name} must be a non-negative integer, got '{raw}'"
        ))
    })
}
