//! Repository client configuration.
//!
//! Points at the personal data server (PDS) that hosts the user's repository.
//! Defaults to the public Bluesky PDS. Override via environment variables or
//! explicit construction for self-hosted servers and tests.

use url::Url;
use zeroize::Zeroizing;

/// Configuration for connecting to an AT Protocol repository.
///
/// Custom `Debug` implementation redacts the `access_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct RepoConfig {
    /// Base URL of the PDS. Default: <https://bsky.social>
    pub pds_url: Url,
    /// Session access token, sent as a bearer token. Wiped on drop.
    pub access_token: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub retry_base_delay_ms: u64,
}

impl std::fmt::Debug for RepoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoConfig")
            .field("pds_url", &self.pds_url)
            .field("access_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}

impl RepoConfig {
    /// Default PDS.
    pub const DEFAULT_PDS_URL: &'static str = "https://bsky.social";

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DIDLINK_PDS_URL` (default: `https://bsky.social`)
    /// - `DIDLINK_ACCESS_TOKEN` (required)
    /// - `DIDLINK_TIMEOUT_SECS` (default: 30)
    /// - `DIDLINK_MAX_RETRIES` (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_token =
            std::env::var("DIDLINK_ACCESS_TOKEN").map_err(|_| ConfigError::MissingToken)?;
        Self::new(
            env_url("DIDLINK_PDS_URL", Self::DEFAULT_PDS_URL)?,
            &access_token,
        )
        .map(|cfg| Self {
            timeout_secs: env_number("DIDLINK_TIMEOUT_SECS", 30),
            max_retries: env_number("DIDLINK_MAX_RETRIES", 3),
            ..cfg
        })
    }

    /// Build a configuration with default timeout and retry budget.
    pub fn new(pds_url: Url, access_token: &str) -> Result<Self, ConfigError> {
        if access_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(Self {
            pds_url,
            access_token: Zeroizing::new(access_token.to_string()),
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 200,
        })
    }

    /// Create a configuration pointing to a local mock server (for testing).
    ///
    /// Short timeout and near-zero backoff so retry tests stay fast.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `url` cannot be parsed.
    pub fn local_mock(url: &str, token: &str) -> Result<Self, ConfigError> {
        let pds_url = Url::parse(url)
            .map_err(|e| ConfigError::InvalidUrl("local_mock".to_string(), e.to_string()))?;
        Ok(Self {
            timeout_secs: 5,
            retry_base_delay_ms: 5,
            ..Self::new(pds_url, token)?
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("DIDLINK_ACCESS_TOKEN is required")]
    MissingToken,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
