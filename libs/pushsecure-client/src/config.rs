//! PushSecure client configuration
//!
//! Loaded from environment variables for services that embed the client,
//! or built directly by applications that already know the host.

use std::env;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::errors::{PushSecureError, Result};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSecureConfig {
    /// Base API URL, e.g. `https://push.chatsecure.org/api/v1/`
    pub api_host: String,

    /// Token of a previously authenticated account
    pub auth_token: Option<String>,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds
    pub connect_timeout_secs: u64,

    pub user_agent: String,
}

impl PushSecureConfig {
    /// Create configuration for the given host with default timeouts
    pub fn new(api_host: impl Into<String>) -> Self {
        Self {
            api_host: api_host.into(),
            auth_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }

    /// Set the account token attached to requests
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Load configuration from environment variables
    ///
    /// - `PUSHSECURE_API_HOST` (required)
    /// - `PUSHSECURE_AUTH_TOKEN`
    /// - `PUSHSECURE_REQUEST_TIMEOUT_SECS` (default 30)
    /// - `PUSHSECURE_CONNECT_TIMEOUT_SECS` (default 10)
    /// - `PUSHSECURE_USER_AGENT`
    pub fn from_env() -> Result<Self> {
        let api_host = env::var("PUSHSECURE_API_HOST")
            .map_err(|_| PushSecureError::Config("PUSHSECURE_API_HOST is not set".to_string()))?;

        let config = Self {
            api_host,
            auth_token: env::var("PUSHSECURE_AUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            request_timeout_secs: env::var("PUSHSECURE_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout_secs: env::var("PUSHSECURE_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: env::var("PUSHSECURE_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        parse_base_url(&self.api_host)?;

        if self.request_timeout_secs == 0 {
            return Err(PushSecureError::Config(
                "request timeout must be positive".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(PushSecureError::Config(
                "connect timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

pub(crate) fn default_user_agent() -> String {
    format!("pushsecure-client/{}", env!("CARGO_PKG_VERSION"))
}

/// Parse the API host, requiring http(s) and a trailing slash on the path
pub(crate) fn parse_base_url(api_host: &str) -> Result<Url> {
    let mut url = Url::parse(api_host)
        .map_err(|e| PushSecureError::InvalidUrl(format!("{}: {}", api_host, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(PushSecureError::InvalidUrl(format!(
            "{}: expected an http(s) base URL",
            api_host
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
