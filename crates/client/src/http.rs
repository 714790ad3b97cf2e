//! Request and response model seen by the offline worker.
//!
//! Bodies are buffered as [`Bytes`], so handing the same response to the
//! caller and to the cache is a cheap reference-counted clone and a cache
//! write can never consume the body the caller reads.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Method, StatusCode};
use swcache_core::{CachedResponse, Error, RequestKey};
use url::Url;

/// What the page intends to do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    /// Top-level navigation.
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    /// `fetch()`/XHR and anything else without a destination.
    #[default]
    Empty,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Image => "image",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Empty => "",
        }
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "image" => Ok(Destination::Image),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            "" | "empty" => Ok(Destination::Empty),
            other => Err(Error::InvalidInput(format!("unknown request destination: {other}"))),
        }
    }
}

/// An intercepted outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
}

impl Request {
    pub fn new(method: Method, url: Url, destination: Destination) -> Self {
        Self { method, url, destination }
    }

    /// A GET without a destination, as issued by `fetch()` or a cache batch.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, Destination::Empty)
    }

    /// A top-level document navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, Destination::Document)
    }

    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }

    /// Cache identity of this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.as_str(), self.url.as_str())
    }
}

/// How the response relates to the worker's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Same-origin, readable.
    Basic,
    /// Cross-origin with CORS approval.
    Cors,
    /// Cross-origin without CORS approval.
    Opaque,
    OpaqueRedirect,
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::OpaqueRedirect => "opaqueredirect",
            ResponseType::Error => "error",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            "opaqueredirect" => Ok(ResponseType::OpaqueRedirect),
            "error" => Ok(ResponseType::Error),
            other => Err(Error::InvalidInput(format!("unknown response type: {other}"))),
        }
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct Response {
    /// URL the response came from (after redirects).
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub response_type: ResponseType,
}

impl Response {
    /// Only direct, successful responses may be written to the cache.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.response_type == ResponseType::Basic
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Copy this response into its stored form.
    pub fn to_cached(&self) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();

        CachedResponse {
            url: self.url.to_string(),
            status: self.status.as_u16(),
            response_type: self.response_type.as_str().to_string(),
            headers,
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from its stored form.
    pub fn from_cached(cached: CachedResponse) -> Result<Self, Error> {
        let url = Url::parse(&cached.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", cached.url)))?;
        let status = StatusCode::from_u16(cached.status)
            .map_err(|e| Error::InvalidInput(format!("stored status {}: {e}", cached.status)))?;
        let response_type = cached.response_type.parse()?;

        let mut headers = HeaderMap::with_capacity(cached.headers.len());
        for (name, value) in &cached.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidInput(format!("stored header name {name}: {e}")))?;
            let value = HeaderValue::from_bytes(value)
                .map_err(|e| Error::InvalidInput(format!("stored header value for {name}: {e}")))?;
            headers.append(name, value);
        }

        Ok(Self { url, status, headers, body: Bytes::from(cached.body), response_type })
    }
}
