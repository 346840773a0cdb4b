//! HTTP transport for the wg-easy API
//!
//! The session layer only needs "send this request with this cookie and
//! give me status, cookies and body back", so the wire is hidden behind the
//! [`Transport`] trait. [`HttpTransport`] is the reqwest implementation.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::BuildError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure to get any response at all
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Connection failed: {0}")]
    Connection(String),
}

/// A request relative to the server's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body,
        }
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: None,
        }
    }
}

/// What the session layer needs from a response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Raw `Set-Cookie` header values, in order
    pub set_cookie: Vec<String>,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            set_cookie: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.set_cookie.push(cookie.into());
        self
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request, attaching `cookie` as the `Cookie` header if set.
    ///
    /// Any HTTP status counts as success here; only a missing response is an
    /// error.
    async fn execute(
        &self,
        request: &ApiRequest,
        cookie: Option<&str>,
    ) -> Result<ApiResponse, TransportError>;
}

/// Options for the reqwest transport
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    /// Accept self-signed certificates (common on LAN wg-easy installs)
    pub accept_invalid_certs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// # Arguments
    /// * `base_url` - Server root, e.g. `https://vpn.example.com` or
    ///   `http://127.0.0.1:51821`. A path prefix is kept.
    pub fn new(base_url: &str, options: &ClientOptions) -> Result<Self, BuildError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(BuildError::MissingBaseUrl);
        }
        Url::parse(base_url).map_err(|e| BuildError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        Ok(Self {
            base_url: base_url.to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        cookie: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(&request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let set_cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = response.text().await?;
        debug!("{} {} -> {}", request.method, url, status);

        Ok(ApiResponse {
            status,
            set_cookie,
            body,
        })
    }
}
