//! Network fetch capability.
//!
//! ### Contract
//! - A fetch either yields a buffered [`Response`] (any status) or fails
//!   with `NETWORK_FETCH_FAILED`. Non-2xx statuses are responses, not errors.
//!
//! ### Response classification
//! - Same-origin request and final URL: `basic`
//! - Cross-origin with `Access-Control-Allow-Origin`: `cors`
//! - Anything else (including same-origin redirected off-origin): `opaque`
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Request timeout: 20s (configurable)

pub mod url;

use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, has_extension, resolve, same_origin};

use crate::http::{Request, Response, ResponseType};
use swcache_core::{AppConfig, Error};
use ::url::Url;

/// Anything that can answer a request from the network.
///
/// The offline worker only talks to the network through this trait.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform a live fetch.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetch client that classifies responses relative to the worker origin.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
    origin: Url,
}

impl FetchClient {
    /// Create a new fetch client for a worker served from `origin`.
    pub fn new(config: FetchConfig, origin: Url) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkFetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config, origin })
    }

    /// Classify a response by where it was requested from and where it ended up.
    pub fn classify(&self, request_url: &Url, final_url: &Url, headers: &header::HeaderMap) -> ResponseType {
        if same_origin(&self.origin, request_url) && same_origin(&self.origin, final_url) {
            ResponseType::Basic
        } else if headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
            ResponseType::Cors
        } else {
            ResponseType::Opaque
        }
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::NetworkFetch(format!("timed out fetching {}: {}", request.url, e))
                } else {
                    Error::NetworkFetch(format!("network error fetching {}: {}", request.url, e))
                }
            })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::NetworkFetch(format!(
                "{}: {} bytes exceeds {}",
                request.url, len, self.config.max_bytes
            )));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkFetch(format!("failed to read response from {}: {}", request.url, e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::NetworkFetch(format!(
                "{}: {} bytes exceeds {}",
                request.url,
                body.len(),
                self.config.max_bytes
            )));
        }

        let response_type = self.classify(&request.url, &final_url, &headers);

        tracing::debug!(
            "fetched {} {} -> {} {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            response_type,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { url: final_url, status, headers, body, response_type })
    }
}
