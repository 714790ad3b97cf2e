//! Offline cache resolver.
//!
//! ### Install
//! - Fetch every manifest asset and store them in one transaction under the
//!   current version. Any failure discards the batch (`CACHE_POPULATION_FAILED`).
//! - On success, request skip-waiting.
//!
//! ### Activate
//! - Delete every cache store whose name is not the current version, then
//!   claim open clients.
//!
//! ### Fetch
//! - Non-GET (and, when restricted, cross-origin) requests pass through.
//! - Network-first extensions: network, refresh cache, cache when offline.
//! - Everything else: cache, else network with write-through of `200 basic`
//!   responses; offline navigations get the cached shell page.
//!
//! ### Message
//! - `{"type": "SKIP_WAITING"}` requests skip-waiting.

pub mod config;
pub mod event;
pub mod lifecycle;
pub mod policy;

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde_json::Value;
use swcache_core::{CacheDb, Error, RequestKey};

pub use config::WorkerConfig;
pub use event::{EventOutcome, FetchOutcome, WorkerEvent, WorkerMessage};
pub use lifecycle::{Lifecycle, WorkerState};
pub use policy::{PassthroughReason, Route, route};

use crate::fetch::Network;
use crate::http::{Request, Response};

/// One versioned offline worker.
pub struct OfflineWorker {
    config: WorkerConfig,
    cache: CacheDb,
    network: Arc<dyn Network>,
    lifecycle: Lifecycle,
}

impl OfflineWorker {
    pub fn new(config: WorkerConfig, cache: CacheDb, network: Arc<dyn Network>) -> Self {
        Self { config, cache, network, lifecycle: Lifecycle::new() }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn version(&self) -> &str {
        &self.config.version_id
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    /// Dispatch one event to its handler.
    pub async fn handle(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        match event {
            WorkerEvent::Install => self.on_install().await.map(|cached| EventOutcome::Installed { cached }),
            WorkerEvent::Activate => self.on_activate().await.map(|evicted| EventOutcome::Activated { evicted }),
            WorkerEvent::Fetch(request) => self.on_fetch(&request).await.map(EventOutcome::Fetched),
            WorkerEvent::Message(payload) => Ok(EventOutcome::Message { handled: self.on_message(&payload) }),
        }
    }

    /// Populate the current store from the asset manifest.
    ///
    /// Returns the number of cached assets. The worker ends up `installed`
    /// either way; skip-waiting is only requested on success.
    pub async fn on_install(&self) -> Result<usize, Error> {
        self.lifecycle.advance(WorkerState::Installing)?;
        tracing::info!(version = %self.config.version_id, "installing offline worker");

        let result = self.populate().await;
        self.lifecycle.advance(WorkerState::Installed)?;

        match result {
            Ok(cached) => {
                tracing::info!(version = %self.config.version_id, cached, "asset manifest cached");
                self.lifecycle.skip_waiting();
                Ok(cached)
            }
            Err(e) => {
                tracing::warn!(version = %self.config.version_id, error = %e, "failed to cache asset manifest");
                Err(e)
            }
        }
    }

    async fn populate(&self) -> Result<usize, Error> {
        let version = self.config.version_id.as_str();
        self.cache
            .open_store(version)
            .await
            .map_err(|e| Error::CachePopulation(format!("open {version}: {e}")))?;

        let fetches = self.config.asset_manifest.iter().map(|url| async move {
            let request = Request::get(url.clone());
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::CachePopulation(format!("{url}: {e}")))?;
            if !response.status.is_success() {
                return Err(Error::CachePopulation(format!("{url}: status {}", response.status.as_u16())));
            }
            Ok::<_, Error>((request.key(), response.to_cached()))
        });
        let entries = try_join_all(fetches).await?;

        self.cache
            .put_all(version, entries)
            .await
            .map_err(|e| Error::CachePopulation(format!("store {version}: {e}")))
    }

    /// Evict stale stores, then claim clients.
    ///
    /// Returns the names of the deleted stores.
    pub async fn on_activate(&self) -> Result<Vec<String>, Error> {
        self.lifecycle.advance(WorkerState::Activating)?;
        let current = self.config.version_id.as_str();

        let mut evicted = Vec::new();
        for name in self.cache.store_names().await? {
            if name == current {
                continue;
            }
            tracing::info!(store = %name, "removing stale cache store");
            if self.cache.delete_store(&name).await? {
                evicted.push(name);
            }
        }

        self.lifecycle.claim_clients();
        self.lifecycle.advance(WorkerState::Activated)?;
        tracing::info!(version = %current, evicted = evicted.len(), "offline worker active");

        Ok(evicted)
    }

    /// Answer an intercepted request.
    ///
    /// `Err` means the caller sees a failed fetch.
    pub async fn on_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        match route(&self.config, request) {
            Route::Passthrough(reason) => {
                tracing::trace!(url = %request.url, ?reason, "not intercepted");
                Ok(FetchOutcome::Passthrough)
            }
            Route::NetworkFirst => self.network_first(request).await,
            Route::CacheFirst => self.cache_first(request).await,
        }
    }

    /// Handle a posted message. Returns whether it was recognised.
    pub fn on_message(&self, payload: &Value) -> bool {
        match WorkerMessage::from_payload(payload) {
            Some(WorkerMessage::SkipWaiting) => {
                tracing::info!(version = %self.config.version_id, "skip waiting requested by client");
                self.lifecycle.skip_waiting();
                true
            }
            None => false,
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let key = request.key();

        if let Some(cached) = self.lookup(&key).await? {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(FetchOutcome::Cache(cached));
        }

        tracing::debug!(url = %request.url, destination = request.destination.as_str(), "cache miss");
        match self.network.fetch(request).await {
            Ok(response) => {
                self.write_through(&key, &response).await;
                Ok(FetchOutcome::Network(response))
            }
            Err(e) => {
                tracing::info!(url = %request.url, error = %e, "fetch failed");
                if request.is_navigation() {
                    let shell = RequestKey::get(self.config.offline_fallback.as_str());
                    if let Some(page) = self.lookup(&shell).await? {
                        return Ok(FetchOutcome::OfflineFallback(page));
                    }
                    tracing::warn!(fallback = %self.config.offline_fallback, "offline shell page not cached");
                }
                Err(e)
            }
        }
    }

    async fn network_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let key = request.key();

        match self.network.fetch(request).await {
            Ok(response) => {
                self.write_through(&key, &response).await;
                Ok(FetchOutcome::Network(response))
            }
            Err(e) => {
                tracing::info!(url = %request.url, error = %e, "fetch failed, trying cache");
                Ok(match self.lookup(&key).await? {
                    Some(cached) => FetchOutcome::Cache(cached),
                    None => FetchOutcome::NoResponse,
                })
            }
        }
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        match self.cache.match_request(&self.config.version_id, key).await? {
            Some(cached) => Response::from_cached(cached).map(Some),
            None => Ok(None),
        }
    }

    /// Store a copy of a valid response. Failures are logged and dropped.
    async fn write_through(&self, key: &RequestKey, response: &Response) {
        if !response.is_cacheable() {
            tracing::debug!(
                url = %key.url,
                status = response.status.as_u16(),
                response_type = %response.response_type,
                "response not cached"
            );
            return;
        }

        let copy = response.to_cached();
        if let Err(e) = self.cache.put(&self.config.version_id, key, &copy).await {
            let err = Error::CacheWrite(format!("{}: {e}", key.url));
            tracing::warn!(error = %err, "ignoring cache write failure");
        }
    }
}
