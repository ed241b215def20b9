//! Configuration structures for Terminus clients.
//!
//! This module provides the validated configuration used to build an
//! [`HttpRequester`](crate::request::HttpRequester): API host, session token,
//! TLS settings and request timeout.

use crate::Error;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Default API host used when none is configured.
pub const DEFAULT_HOST: &str = "https://terminus.pantheon.io/api/";

/// Environment variable holding the API host.
pub const ENV_HOST: &str = "TERMINUS_HOST";
/// Environment variable holding the session token.
pub const ENV_SESSION_TOKEN: &str = "TERMINUS_SESSION_TOKEN";
/// Environment variable toggling TLS verification.
pub const ENV_TLS_VERIFY: &str = "TERMINUS_TLS_VERIFY";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT: &str = "TERMINUS_TIMEOUT";

/// Configuration for a Terminus client instance.
///
/// The session token is never serialized and is redacted from `Debug` output.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TerminusConfig {
    /// API base URL
    #[validate(url)]
    pub host: String,

    /// Session token sent as a bearer credential
    #[serde(skip)]
    pub session_token: Option<SecretString>,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to custom CA certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<std::path::PathBuf>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl TerminusConfig {
    /// Create a new client configuration for the given API host.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(host: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            host: host.into(),
            ..Self::default()
        };

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Build a configuration from the process environment.
    ///
    /// Reads `TERMINUS_HOST`, `TERMINUS_SESSION_TOKEN`, `TERMINUS_TLS_VERIFY` and
    /// `TERMINUS_TIMEOUT`; unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unparsable value.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or validation fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let mut config = Self::new(host)?;

        if let Some(token) = lookup(ENV_SESSION_TOKEN).filter(|t| !t.is_empty()) {
            config = config.with_session_token(token);
        }

        if let Some(raw) = lookup(ENV_TLS_VERIFY) {
            let verify = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(Error::ConfigError(format!(
                        "Invalid value for {ENV_TLS_VERIFY}: `{other}`"
                    )))
                }
            };
            config = config.with_tls_verify(verify);
        }

        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                Error::ConfigError(format!("Invalid value for {ENV_TIMEOUT}: {e}"))
            })?;
            config = config.with_timeout(secs);
            config.validate()?;
        }

        Ok(config)
    }

    /// Set the session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(SecretString::from(token.into()));
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: std::path::PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the host URL, normalised to end in `/` so relative paths join under it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_host(&self) -> Result<Url, Error> {
        let mut url =
            Url::parse(&self.host).map_err(|e| Error::ConfigError(format!("Invalid host: {e}")))?;

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }
}

impl Default for TerminusConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            session_token: None,
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
