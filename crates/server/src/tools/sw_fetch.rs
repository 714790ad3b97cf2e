//! sw_fetch tool implementation.
//!
//! Sends a request through the registration, as a page in scope would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::resolve;
use swcache_client::http::Method;
use swcache_client::{Destination, Request};
use swcache_core::Error;

use super::json_result;
use crate::handler::WorkerHost;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// URL to fetch; relative URLs resolve against the app scope.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: "document" for navigations, empty otherwise.
    #[serde(default)]
    pub destination: String,

    /// Maximum characters of body text to return (default: 20000).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_method() -> String {
    "GET".into()
}

fn default_max_chars() -> usize {
    20_000
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// Absolute URL that was requested.
    pub url: String,
    /// cache, network, offline-fallback, bypass or none.
    pub source: String,
    pub status: Option<u16>,
    pub response_type: Option<String>,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8 (lossy), truncated to `max_chars`.
    pub body: Option<String>,
    pub body_bytes: usize,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(host: &WorkerHost, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&host.config.scope, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = parse_method(&params.method)?;
    let destination: Destination = params.destination.parse()?;

    let request = Request::new(method, url.clone(), destination);
    let outcome = host.registration.fetch(request).await?;

    let source = outcome.source().to_string();
    let output = match outcome.into_response() {
        Some(response) => SwFetchOutput {
            url: url.to_string(),
            source,
            status: Some(response.status.as_u16()),
            response_type: Some(response.response_type.to_string()),
            content_type: response.content_type().map(str::to_string),
            body: Some(String::from_utf8_lossy(&response.body).chars().take(params.max_chars).collect()),
            body_bytes: response.body.len(),
        },
        None => SwFetchOutput {
            url: url.to_string(),
            source,
            status: None,
            response_type: None,
            content_type: None,
            body: None,
            body_bytes: 0,
        },
    };

    json_result(&output)
}

fn parse_method(method: &str) -> Result<Method, Error> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|e| Error::InvalidInput(format!("invalid method {method}: {e}")))
}
