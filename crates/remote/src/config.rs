use std::fmt;
use std::time::Duration;

use crate::error::{RemoteApiError, Result};

pub const API_URL_ENV: &str = "LEIRAD_API_URL";
pub const API_KEY_ENV: &str = "LEIRAD_API_KEY";
pub const TIMEOUT_ENV: &str = "LEIRAD_API_TIMEOUT_SECS";

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the hosted backend.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Project URL without the `/rest/v1` suffix; trailing `/` is trimmed.
    pub base_url: String,
    /// Sent as both the `apikey` header and the bearer token.
    pub api_key: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `LEIRAD_API_URL`, `LEIRAD_API_KEY` and the optional
    /// `LEIRAD_API_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| RemoteApiError::config(format!("{} is not set", name)))
        };
        let base_url = required(API_URL_ENV)?;
        let api_key = required(API_KEY_ENV)?;

        let timeout = match lookup(TIMEOUT_ENV) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                RemoteApiError::config(format!("{} must be whole seconds, got '{}'", TIMEOUT_ENV, raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(&base_url, api_key).with_timeout(Duration::from_secs(timeout)))
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
