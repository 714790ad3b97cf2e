//! Scripted in-process network for exercising the worker without sockets.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use swcache_core::Error;
use url::Url;

use crate::fetch::Network;
use crate::http::{Request, Response, ResponseType};

#[derive(Debug, Clone)]
enum Scripted {
    Respond { status: StatusCode, body: Bytes, response_type: ResponseType, content_type: &'static str },
    Fail,
}

/// Network double answering from a URL table and recording every call.
///
/// Unscripted URLs answer `404 basic`.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<(Method, String)>>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and a `basic` response.
    pub fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
        self.respond_with_type(url, status, body, ResponseType::Basic)
    }

    pub fn respond_with_type(&self, url: &str, status: u16, body: &str, response_type: ResponseType) -> &Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let content_type = if url.ends_with(".xml") { "application/xml" } else { "text/html" };
        self.insert(
            url,
            Scripted::Respond { status, body: Bytes::copy_from_slice(body.as_bytes()), response_type, content_type },
        );
        self
    }

    /// Make fetches of `url` fail outright.
    pub fn fail(&self, url: &str) -> &Self {
        self.insert(url, Scripted::Fail);
        self
    }

    /// Make every fetch fail.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|(_, u)| u == url).count()
    }

    fn insert(&self, url: &str, scripted: Scripted) {
        let key = Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string());
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(key, scripted);
        }
    }
}

#[async_trait::async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((request.method.clone(), request.url.to_string()));
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::NetworkFetch(format!("offline: {}", request.url)));
        }

        let scripted = self
            .routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(request.url.as_str()).cloned());

        match scripted {
            Some(Scripted::Fail) => Err(Error::NetworkFetch(format!("connection refused: {}", request.url))),
            Some(Scripted::Respond { status, body, response_type, content_type }) => {
                let mut headers = HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
                Ok(Response { url: request.url.clone(), status, headers, body, response_type })
            }
            None => Ok(Response {
                url: request.url.clone(),
                status: StatusCode::NOT_FOUND,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                response_type: ResponseType::Basic,
            }),
        }
    }
}
