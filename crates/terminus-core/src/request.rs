//! The request collaborator used by collections and models.
//!
//! [`Requester`] is the narrow seam between resource collections and the HTTP
//! transport: one call, one decoded response. [`HttpRequester`] implements it on top
//! of reqwest. Failures are mapped to [`Error`] kinds and returned as-is; nothing here
//! retries.

use crate::client::ClientConfig;
use crate::config::TerminusConfig;
use crate::query::QueryParams;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("terminus-core/", env!("CARGO_PKG_VERSION"));

/// Options accompanying a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    /// HTTP method, `GET` unless overridden.
    pub method: Method,
    /// Query string pairs, in order.
    pub query: Vec<(String, String)>,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl RequestOptions {
    /// Options for a plain `GET`.
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    /// Override the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append query parameters.
    #[must_use]
    pub fn with_query(mut self, params: QueryParams) -> Self {
        self.query.extend(
            params
                .into_pairs()
                .into_iter()
                .map(|(key, value)| (key.to_string(), value)),
        );
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up the first query value for `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            body: None,
        }
    }
}

/// A decoded API response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers that were valid UTF-8.
    pub headers: BTreeMap<String, String>,
    /// Decoded JSON body, `None` when the body was empty.
    pub data: Option<Value>,
}

impl ApiResponse {
    /// A `200 OK` response carrying `data`.
    #[must_use]
    pub fn with_data(data: Value) -> Self {
        Self {
            status_code: 200,
            headers: BTreeMap::new(),
            data: Some(data),
        }
    }

    /// A response with the given status and no body.
    #[must_use]
    pub fn empty(status_code: u16) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            data: None,
        }
    }
}

/// Performs a single request against the management API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Requester: Send + Sync {
    /// Send one request to `path` (relative to the API host) and decode the response.
    ///
    /// # Errors
    ///
    /// Returns a transport error for network failures and non-2xx statuses, or
    /// [`Error::ParseError`] when the body is not JSON.
    async fn request(&self, path: &str, options: &RequestOptions) -> Result<ApiResponse>;
}

/// Builder for [`HttpRequester`].
#[derive(Debug, Clone)]
pub struct HttpRequesterBuilder {
    config: TerminusConfig,
    http_config: Option<ClientConfig>,
}

impl HttpRequesterBuilder {
    /// Create a new builder from a [`TerminusConfig`].
    #[must_use]
    pub fn new(config: TerminusConfig) -> Self {
        Self {
            config,
            http_config: None,
        }
    }

    /// Override the HTTP client configuration used when building the requester.
    ///
    /// Its timeout replaces the one from [`TerminusConfig`].
    #[must_use]
    pub fn with_http_config(mut self, http_config: ClientConfig) -> Self {
        self.http_config = Some(http_config);
        self
    }

    /// Finalise the builder and create the [`HttpRequester`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when the host, CA certificate or TLS settings
    /// cannot be turned into a working client.
    pub fn build(self) -> Result<HttpRequester> {
        let base_url = self.config.parse_host()?;

        let http_config = self
            .http_config
            .unwrap_or_else(|| ClientConfig::new().with_timeout(self.config.timeout()));

        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(http_config.timeout)
            .connect_timeout(http_config.connect_timeout)
            .pool_idle_timeout(http_config.pool_idle_timeout)
            .pool_max_idle_per_host(http_config.pool_max_idle_per_host)
            .gzip(http_config.enable_compression);

        if !self.config.tls_verify {
            warn!("TLS verification disabled for Terminus client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_cert) = &self.config.tls_ca_cert {
            debug!("loading CA certificate from {}", ca_cert.display());
            let bytes = std::fs::read(ca_cert).map_err(|err| {
                Error::ConfigError(format!(
                    "Failed to read CA certificate {}: {err}",
                    ca_cert.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&bytes)
                .map_err(|err| Error::ConfigError(format!("Invalid CA certificate: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))?;

        Ok(HttpRequester {
            http,
            base_url,
            timeout: http_config.timeout,
            session_token: self.config.session_token,
            log_requests: http_config.enable_logging,
        })
    }
}

/// reqwest-backed [`Requester`].
#[derive(Clone)]
pub struct HttpRequester {
    http: Client,
    base_url: Url,
    timeout: Duration,
    session_token: Option<SecretString>,
    log_requests: bool,
}

impl HttpRequester {
    /// Construct a requester directly from the configuration.
    ///
    /// # Errors
    ///
    /// See [`HttpRequesterBuilder::build`].
    pub fn from_config(config: &TerminusConfig) -> Result<Self> {
        HttpRequesterBuilder::new(config.clone()).build()
    }

    /// Start a builder pre-populated with the provided configuration.
    #[must_use]
    pub fn builder(config: TerminusConfig) -> HttpRequesterBuilder {
        HttpRequesterBuilder::new(config)
    }

    /// Return the base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Total timeout applied to each request.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid path `{path}`: {err}")))
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn request(&self, path: &str, options: &RequestOptions) -> Result<ApiResponse> {
        let url = self.build_url(path)?;
        let mut request = self
            .http
            .request(options.method.clone(), url)
            .query(&options.query)
            .header("Accept", "application/json");

        if let Some(token) = &self.session_token {
            request = request.bearer_auth(token.expose_secret());
        }

        if let Some(body) = &options.body {
            request = request.json(body);
        }

        if self.log_requests {
            info!(method = %options.method, path = %path, query = ?options.query, "Sending Terminus request");
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(path = %path, status = status.as_u16(), "Received Terminus response");

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_to_error(status, message));
        }

        let bytes = response.bytes().await?;
        let data = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            let value = serde_json::from_slice::<Value>(&bytes).map_err(|err| {
                Error::ParseError(format!("Failed to parse response for `{path}`: {err}"))
            })?;
            Some(value)
        };

        Ok(ApiResponse {
            status_code: status.as_u16(),
            headers,
            data,
        })
    }
}

fn map_status_to_error(status: StatusCode, text: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(text),
        StatusCode::BAD_REQUEST => Error::BadRequest(text),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::InvalidRequest(format!("Authentication failed: {text}"))
        }
        StatusCode::CONFLICT => Error::Conflict(text),
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            Error::ServiceUnavailable(format!("API temporarily unavailable: {text}"))
        }
        status if status.is_server_error() => {
            Error::ServiceUnavailable(format!("API server error {status}: {text}"))
        }
        _ => Error::HttpError(format!("API error {status}: {text}")),
    }
}
