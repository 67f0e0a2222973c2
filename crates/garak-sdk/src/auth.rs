use std::collections::HashMap;
use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::{GarakError, Result};

pub const API_KEY_PREFIX: &str = "garak_";
pub const MIN_API_KEY_LEN: usize = 32;
const REDACTED_PREFIX_LEN: usize = 8;
const API_KEY_HEADER: &str = "x-api-key";

/// Where an API key may come from, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Explicit,
    Env(&'static str),
}

impl KeySource {
    pub const PRIMARY_ENV: &'static str = "GARAK_API_KEY";
    pub const SECONDARY_ENV: &'static str = "GARAK_SDK_API_KEY";

    /// Lookup order for keys not passed explicitly.
    pub const ENV_CHAIN: [KeySource; 2] = [
        KeySource::Env(Self::PRIMARY_ENV),
        KeySource::Env(Self::SECONDARY_ENV),
    ];
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => f.write_str("explicit argument"),
            Self::Env(name) => write!(f, "environment variable {name}"),
        }
    }
}

/// Check the key shape without touching the network.
pub fn validate_api_key(key: &str) -> bool {
    key.len() >= MIN_API_KEY_LEN
        && key.starts_with(API_KEY_PREFIX)
        && key.bytes().all(|b| b.is_ascii_graphic())
}

/// Validated API key plus the pre-built header values derived from it.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    source: KeySource,
    bearer: HeaderValue,
    key_header: HeaderValue,
}

impl Credentials {
    /// Resolve a key from `explicit` or, failing that, the process environment.
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        Self::resolve_from(explicit, &std::env::vars().collect())
    }

    pub(crate) fn resolve_from(explicit: Option<&str>, vars: &HashMap<String, String>) -> Result<Self> {
        if let Some(key) = explicit {
            return Self::new(key, KeySource::Explicit);
        }
        for source in KeySource::ENV_CHAIN {
            let KeySource::Env(name) = source else {
                continue;
            };
            if let Some(value) = vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                return Self::new(value, source);
            }
        }
        Err(GarakError::authentication(format!(
            "No API key provided. Pass one explicitly or set {} (or {}).",
            KeySource::PRIMARY_ENV,
            KeySource::SECONDARY_ENV
        )))
    }

    fn new(key: &str, source: KeySource) -> Result<Self> {
        if !validate_api_key(key) {
            return Err(GarakError::invalid_configuration(format!(
                "Invalid API key format from {source}: expected a `{API_KEY_PREFIX}` key of at least {MIN_API_KEY_LEN} characters"
            )));
        }
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
            GarakError::invalid_configuration("Invalid API key format: not a valid header value")
        })?;
        bearer.set_sensitive(true);
        let mut key_header = HeaderValue::from_str(key).map_err(|_| {
            GarakError::invalid_configuration("Invalid API key format: not a valid header value")
        })?;
        key_header.set_sensitive(true);
        Ok(Self {
            api_key: key.to_string(),
            source,
            bearer,
            key_header,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    /// First characters of the key followed by `...`, safe to log.
    pub fn key_prefix(&self) -> String {
        let head: String = self.api_key.chars().take(REDACTED_PREFIX_LEN).collect();
        format!("{head}...")
    }

    /// Fresh header map on every call; callers may mutate it freely.
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(AUTHORIZATION, self.bearer.clone());
        headers.insert(API_KEY_HEADER, self.key_header.clone());
        headers
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key_prefix())
            .field("source", &self.source)
            .finish()
    }
}
