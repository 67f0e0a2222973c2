use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://detect.garaksecurity.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`crate::GarakClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Explicit key; `None` falls back to the environment chain in [`crate::auth::KeySource`].
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub verify_ssl: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            verify_ssl: true,
        }
    }
}

impl ClientConfig {
    const BASE_URL_ENV: &'static str = "GARAK_API_BASE_URL";
    const TIMEOUT_ENV: &'static str = "GARAK_TIMEOUT_SECS";

    pub fn new() -> Self {
        Self::default()
    }

    /// Load connection settings from environment variables.
    ///
    /// * `GARAK_API_BASE_URL`: service root (default: `https://detect.garaksecurity.com`).
    /// * `GARAK_TIMEOUT_SECS`: per-request timeout in seconds (default: 30).
    ///
    /// The API key itself is resolved later by [`crate::auth::Credentials`].
    pub fn from_env() -> Self {
        Self::from_map(&std::env::vars().collect())
    }

    pub(crate) fn from_map(vars: &HashMap<String, String>) -> Self {
        let mut config = Self::default();
        if let Some(base) = vars
            .get(Self::BASE_URL_ENV)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
        {
            config.base_url = base.to_string();
        }
        if let Some(secs) = vars
            .get(Self::TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = verify_ssl;
        self
    }
}
