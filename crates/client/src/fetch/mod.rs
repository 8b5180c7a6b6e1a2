//! HTTP network pipeline used by the offline worker.
//!
//! ### Network seam
//! - The worker only talks to the network through the `Network` trait so hosts
//!   and tests can substitute their own transport.
//!
//! ### Semantics
//! - A request resolves with a `Response` for every HTTP status, including
//!   4xx/5xx. Only transport failures (DNS, refused, timeout, oversized body)
//!   are errors.
//! - Responses are classified `basic` (same origin as the portal) or `opaque`.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod url;

use async_trait::async_trait;
use portal_core::{AppConfig, Error, Request, Response, ResponseKind};
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve};

/// Transport-level fetch failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0} bytes exceeds {1}")]
    TooLarge(usize, usize),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network(msg) => Error::Network(msg),
            FetchError::Timeout(d) => Error::FetchTimeout(format!("{d:?}")),
            FetchError::TooLarge(len, max) => Error::FetchTooLarge(format!("{len} bytes exceeds {max}")),
            FetchError::InvalidRequest(msg) => Error::InvalidInput(msg),
        }
    }
}

/// Performs requests on behalf of the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send a request. Resolves for any HTTP status; rejects only on transport failure.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "portal-offline/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Portal origin used for response classification.
    pub origin: ::url::Url,
}

impl FetchConfig {
    /// Defaults for everything except the portal origin.
    pub fn new(origin: ::url::Url) -> Self {
        Self {
            user_agent: "portal-offline/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin,
        }
    }

    /// Build from application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::new(origin)
        })
    }
}

/// reqwest-backed `Network`.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.config.timeout)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let start = Instant::now();

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(format!("method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.is_navigation() {
            builder = builder.header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            );
        }

        let response = builder.send().await.map_err(|e| self.classify_error(e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(FetchError::TooLarge(len as usize, self.config.max_bytes));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await.map_err(|e| self.classify_error(e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(FetchError::TooLarge(bytes.len(), self.config.max_bytes));
        }

        let kind = ResponseKind::classify(&final_url, &self.config.origin);

        tracing::debug!(
            url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            kind = kind.as_str(),
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "network fetch"
        );

        Ok(Response {
            url: final_url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes.to_vec(),
            kind,
        })
    }
}
