//! Request routing: which strategy answers an intercepted request.

use reqwest::Method;

use super::WorkerConfig;
use crate::fetch::{has_extension, same_origin};
use crate::http::Request;

/// Why a request is left to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    NonGet,
    CrossOrigin,
}

/// Strategy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; neither read from nor written to the cache.
    Passthrough(PassthroughReason),
    /// Volatile data: network, then cache when offline.
    NetworkFirst,
    /// Cache, then network on a miss.
    CacheFirst,
}

/// Pick the strategy for `request`.
pub fn route(config: &WorkerConfig, request: &Request) -> Route {
    if request.method != Method::GET {
        return Route::Passthrough(PassthroughReason::NonGet);
    }

    if config.origin_restriction && !same_origin(&config.scope, &request.url) {
        return Route::Passthrough(PassthroughReason::CrossOrigin);
    }

    if config
        .network_first_extensions
        .iter()
        .any(|ext| has_extension(&request.url, ext))
    {
        return Route::NetworkFirst;
    }

    Route::CacheFirst
}
