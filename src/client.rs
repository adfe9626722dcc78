//! Transport layer for the RSI web API.
//!
//! Every endpoint is a JSON `POST` against a common base URL. Responses come
//! wrapped in a `{success, data, msg}` envelope which is unwrapped here, so the
//! endpoint modules only ever see the `data` payload.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{RsiError, Result};

/// Default RSI API base URL
pub const DEFAULT_API_URL: &str = "https://robertsspaceindustries.com/api/";

/// Header carrying the optional session token
pub const TOKEN_HEADER: &str = "X-Rsi-Token";

/// Environment variable overriding the base URL
pub const ENV_API_URL: &str = "RSI_API_URL";

/// Environment variable supplying the session token
pub const ENV_TOKEN: &str = "RSI_TOKEN";

const USER_AGENT: &str = concat!("rsiapi/", env!("CARGO_PKG_VERSION"));

/// Client configuration, fixed once the client is built
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL; endpoint paths are joined beneath it
    pub base_url: String,
    /// Session token sent as `X-Rsi-Token` when present
    pub token: Option<String>,
    /// Keep cookies between requests
    pub cookie_store: bool,
    /// User agent for the default transport
    pub user_agent: String,
    /// Request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            cookie_store: false,
            user_agent: USER_AGENT.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `RSI_API_URL` and `RSI_TOKEN` from the environment.
    ///
    /// Empty variables are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }

        if let Ok(token) = std::env::var(ENV_TOKEN) {
            if !token.trim().is_empty() {
                config.token = Some(token.trim().to_string());
            }
        }

        config
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the session token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Enable or disable the cookie store
    pub fn with_cookie_store(mut self, enabled: bool) -> Self {
        self.cookie_store = enabled;
        self
    }

    /// Set a request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// RSI API client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct RsiClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl RsiClient {
    /// Create a client with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client from a configuration
    ///
    /// The transport never follows redirects; a redirect surfaces as a
    /// `BadResponse`.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(Policy::none())
            .cookie_store(config.cookie_store);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| RsiError::config(format!("Failed to build HTTP client: {}", e)))?;

        Self::with_client(client, config)
    }

    /// Create a client around a preconfigured transport
    ///
    /// Only `base_url` and `token` are read from `config`; the transport is
    /// used as given.
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(&config.base_url)?,
            token: config.token,
        })
    }

    /// The underlying HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// The resolved API base URL (always ends with `/`)
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| RsiError::config(format!("Invalid endpoint '{}': {}", endpoint, e)))
    }

    /// POST `payload` to `endpoint` and return the envelope's `data`.
    ///
    /// # Errors
    ///
    /// - `BadResponse` for any status other than 200
    /// - `Network` if the request could not be sent or read
    /// - `Json` / `BadResponseData` if the body is not a JSON object
    /// - `RequestFailed` if the envelope's `success` flag is not truthy
    pub async fn submit_request<P>(&self, endpoint: &str, payload: Option<&P>) -> Result<Value>
    where
        P: Serialize + ?Sized,
    {
        let url = self.endpoint_url(endpoint)?;

        debug!(endpoint = endpoint, url = %url, "Submitting request");

        let mut request = self
            .client
            .post(url)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(CONTENT_TYPE, "application/json")
            .json(&payload);

        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token.as_str());
        }

        let response = request.send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(endpoint = endpoint, status = status.as_u16(), "Unexpected HTTP status");
            return Err(RsiError::BadResponse {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text)?;

        unwrap_envelope(endpoint, body)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| RsiError::config(format!("Invalid base URL '{}': {}", base_url, e)))?;

    if url.cannot_be_a_base() {
        return Err(RsiError::config(format!("Invalid base URL '{}'", base_url)));
    }

    // Url::join replaces the last path segment unless the path ends in '/'
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Unwrap a `{success, data, msg}` envelope into its `data` value.
fn unwrap_envelope(endpoint: &str, body: Value) -> Result<Value> {
    let Value::Object(mut envelope) = body else {
        return Err(RsiError::bad_data(format!(
            "{} response is not a JSON object",
            endpoint
        )));
    };

    let success = envelope.get("success").map(is_truthy).unwrap_or(false);
    if !success {
        let message = match envelope.remove("msg") {
            Some(Value::String(msg)) => msg,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        warn!(endpoint = endpoint, msg = %message, "Request failed");
        return Err(RsiError::RequestFailed {
            endpoint: endpoint.to_string(),
            message,
        });
    }

    Ok(envelope.remove("data").unwrap_or(Value::Null))
}

/// Loose truthiness for the envelope's `success` flag (`1`, `true`, `"1"`, ...)
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
