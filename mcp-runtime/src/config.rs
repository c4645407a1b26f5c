use std::fmt;

use logchef_core::ClientError;
use reqwest::header::HeaderMap;
use thiserror::Error;
use url::Url;

pub const URL_ENV: &str = "LOGCHEF_URL";
pub const API_KEY_ENV: &str = "LOGCHEF_API_KEY";
pub const URL_HEADER: &str = "X-Logchef-URL";
pub const API_KEY_HEADER: &str = "X-Logchef-API-Key";
pub const DEFAULT_URL: &str = "http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid Logchef URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("create Logchef client: {0}")]
    Client(#[from] ClientError),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidUrl(_) => "invalid_url",
            ConfigError::Client(_) => "client_error",
        }
    }
}

/// The two environment variables the resolver reads, captured once.
///
/// Resolution never touches the process environment directly, so tests can
/// hand in whatever values they need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

impl EnvSnapshot {
    pub fn from_process() -> Self {
        Self {
            url: std::env::var(URL_ENV).ok(),
            api_key: std::env::var(API_KEY_ENV).ok(),
        }
    }

    fn url(&self) -> Option<&str> {
        non_empty(self.url.as_deref())
    }

    fn api_key(&self) -> Option<&str> {
        non_empty(self.api_key.as_deref())
    }
}

/// Backend URL and API key for one session or request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: String,
    pub api_key: String,
}

impl Credentials {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("api_key_set", &self.has_api_key())
            .finish()
    }
}

/// Environment-only resolution, used by the stdio transport.
pub fn credentials_from_env(env: &EnvSnapshot) -> Result<Credentials, ConfigError> {
    let url = env.url().unwrap_or(DEFAULT_URL);
    let api_key = env.api_key().unwrap_or_default();
    finish(url, api_key, "env")
}

/// Header-first resolution with per-field environment fallback, used by the
/// HTTP transports. URL and key are resolved independently.
pub fn credentials_from_headers(
    headers: &HeaderMap,
    env: &EnvSnapshot,
) -> Result<Credentials, ConfigError> {
    let url = header_value(headers, URL_HEADER)
        .or_else(|| env.url())
        .unwrap_or(DEFAULT_URL);
    let api_key = header_value(headers, API_KEY_HEADER)
        .or_else(|| env.api_key())
        .unwrap_or_default();
    finish(url, api_key, "headers")
}

fn finish(url: &str, api_key: &str, origin: &'static str) -> Result<Credentials, ConfigError> {
    let base_url = url.strip_suffix('/').unwrap_or(url);
    let parsed = Url::parse(base_url)?;
    tracing::debug!(
        event = "logchef.credentials.resolved",
        origin,
        url = %redact_url(&parsed),
        api_key_set = !api_key.is_empty(),
        "resolved Logchef credentials"
    );
    Ok(Credentials {
        base_url: base_url.to_string(),
        api_key: api_key.to_string(),
    })
}

/// Display form of a URL with any embedded password masked.
pub fn redact_url(url: &Url) -> String {
    if url.password().is_none() {
        return url.to_string();
    }
    let mut redacted = url.clone();
    if redacted.set_password(Some("xxxxx")).is_err() {
        return format!("{}://<redacted>", url.scheme());
    }
    redacted.to_string()
}

fn header_value<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    non_empty(headers.get(key).and_then(|v| v.to_str().ok()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
